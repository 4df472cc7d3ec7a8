use crate::expr::{FormulaError, UnboundSymbol};
use thiserror::Error;

/// Errors raised by constructing or evaluating a secondary value.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PropagationError {
    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error("missing value for symbol '{symbol}': no binding, dependency or default provides it")]
    MissingSymbol { symbol: String },

    #[error("shape mismatch for symbol '{symbol}': expected length {expected}, found length {found}")]
    ShapeMismatch {
        symbol: String,
        expected: usize,
        found: usize,
    },

    #[error("unknown symbol '{symbol}': not used by the formula or any of its dependencies")]
    UnknownSymbol { symbol: String },
}

impl From<UnboundSymbol> for PropagationError {
    fn from(err: UnboundSymbol) -> Self {
        PropagationError::MissingSymbol { symbol: err.0 }
    }
}

/// Result type for propagation operations.
pub type PropagationResult<T> = Result<T, PropagationError>;
