//! First-order Gaussian error propagation.
//!
//! A [`SecondaryValue`] couples a formula with default bindings and nested
//! dependencies. Calling it with [`Bindings`] yields an [`Estimate`]: the
//! value followed by one propagated error per independent error channel.
//! - Partial derivatives are prepared once, at construction
//! - Values and errors may be scalars or equal-length arrays
//! - Dependencies are evaluated recursively unless the caller overrides them

pub mod types;
pub mod error;
pub mod prepare;
pub mod secondary;
mod evaluator;


pub use types::{Binding, Bindings, DependencyResult, DependencyResults, Estimate, SymbolTree, Value};
pub use error::{PropagationError, PropagationResult};
pub use prepare::{FormulaSource, PreparedFormula};
pub use secondary::{SecondaryValue, SecondaryValueBuilder};
