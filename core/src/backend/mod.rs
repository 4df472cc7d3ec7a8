//! Symbolic algebra abstraction layer.
//!
//! The propagation engine only needs four capabilities from an algebra
//! system: parse a formula, differentiate it, simplify it and substitute
//! numeric columns into it. This module provides a trait over those
//! operations, allowing the in-crate implementation to be swapped without
//! touching the propagation logic.

use crate::expr::{self, Columns, Expr, FormulaError, UnboundSymbol};
use nalgebra::DVector;
use std::sync::{Arc, OnceLock};

/// Abstract interface for the symbolic operations used by the propagation engine.
pub trait SymbolicBackend: Send + Sync {
    /// Parse a textual formula into an expression tree.
    fn parse(&self, text: &str) -> Result<Expr, FormulaError>;

    /// Partial derivative of `expr` with respect to `symbol`.
    fn differentiate(&self, expr: &Expr, symbol: &str) -> Result<Expr, FormulaError>;

    /// Algebraically simplify an expression.
    fn simplify(&self, expr: &Expr) -> Expr;

    /// Substitute one column per symbol and evaluate.
    ///
    /// # Arguments
    /// * `expr` - The expression to evaluate
    /// * `columns` - Values for every free symbol, each of length `len`
    /// * `len` - The broadcast length of the call
    fn substitute(
        &self,
        expr: &Expr,
        columns: &Columns,
        len: usize,
    ) -> Result<DVector<f64>, UnboundSymbol>;
}

/// The built-in backend, implemented by the [`crate::expr`] module.
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBackend;

impl SymbolicBackend for NativeBackend {
    fn parse(&self, text: &str) -> Result<Expr, FormulaError> {
        Ok(expr::parse_expression(text)?)
    }

    fn differentiate(&self, expr: &Expr, symbol: &str) -> Result<Expr, FormulaError> {
        expr::differentiate(expr, symbol)
    }

    fn simplify(&self, expr: &Expr) -> Expr {
        expr::simplify(expr)
    }

    fn substitute(
        &self,
        expr: &Expr,
        columns: &Columns,
        len: usize,
    ) -> Result<DVector<f64>, UnboundSymbol> {
        expr::evaluate_columns(expr, columns, len)
    }
}

/// Shared handle to the default backend.
pub fn default_backend() -> Arc<dyn SymbolicBackend> {
    static DEFAULT: OnceLock<Arc<dyn SymbolicBackend>> = OnceLock::new();
    DEFAULT.get_or_init(|| Arc::new(NativeBackend)).clone()
}
