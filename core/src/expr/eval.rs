//! Vectorized numeric evaluation.
//!
//! Every symbol is bound to a column of the same length; the expression is
//! evaluated once over whole columns rather than once per row.

use super::{Expr, UnaryOperator};
use nalgebra::DVector;
use std::collections::BTreeMap;
use thiserror::Error;

/// Symbol name to value column.
pub type Columns = BTreeMap<String, DVector<f64>>;

#[derive(Debug, Error, Clone, PartialEq)]
#[error("no value bound for symbol '{0}'")]
pub struct UnboundSymbol(pub String);

/// Evaluate `expr` over `columns`, producing a column of length `len`.
///
/// Arithmetic follows IEEE semantics: division by zero yields infinities and
/// out-of-domain function arguments yield NaN, exactly like scalar `f64` code.
pub fn evaluate_columns(
    expr: &Expr,
    columns: &Columns,
    len: usize,
) -> Result<DVector<f64>, UnboundSymbol> {
    match expr {
        Expr::Number(n) => Ok(DVector::from_element(len, *n)),
        Expr::Symbol(name) => {
            let column = columns
                .get(name)
                .ok_or_else(|| UnboundSymbol(name.clone()))?;
            debug_assert_eq!(column.len(), len, "column '{}' has the wrong length", name);
            Ok(column.clone())
        }
        Expr::BinaryOp { op, left, right } => {
            let l = evaluate_columns(left, columns, len)?;
            let r = evaluate_columns(right, columns, len)?;
            Ok(l.zip_map(&r, |a, b| op.apply(a, b)))
        }
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => Ok(-evaluate_columns(operand, columns, len)?),
        Expr::FnCall { function, arg } => {
            Ok(evaluate_columns(arg, columns, len)?.map(|x| function.apply(x)))
        }
    }
}
