pub mod expr;
pub mod backend;
pub mod propagation;
pub mod catalog;

pub use backend::{default_backend, NativeBackend, SymbolicBackend};
pub use catalog::{Catalog, CatalogError};
pub use expr::{Expr, FormulaError};
pub use propagation::{
    Binding, Bindings, DependencyResults, Estimate, PropagationError, SecondaryValue, Value,
};

pub fn version() -> &'static str {
    "0.1.0"
}
