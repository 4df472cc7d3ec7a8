//! Symbolic formula expressions.
//!
//! Provides the expression tree behind every formula together with:
//! - A parser for textual formulas (`a*b + c`, `sqrt(x**2 + y^2)`)
//! - Symbolic differentiation with respect to a named symbol
//! - Light algebraic simplification
//! - Vectorized numeric evaluation over `nalgebra` columns
//! - Human readable rendering through `Display`

pub mod parser;
pub mod derivative;
pub mod simplify;
pub mod eval;
mod display;

#[cfg(test)]
mod tests;

pub use parser::{parse_expression, ParseError};
pub use derivative::differentiate;
pub use simplify::simplify;
pub use eval::{evaluate_columns, Columns, UnboundSymbol};

use std::collections::BTreeSet;
use thiserror::Error;

/// Errors raised while turning a formula into a prepared, differentiable expression.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FormulaError {
    #[error("invalid formula: {0}")]
    Parse(#[from] ParseError),

    #[error("'{function}' is not differentiable with respect to '{symbol}'")]
    NotDifferentiable { function: String, symbol: String },
}

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Numeric literal
    Number(f64),
    /// Named symbol, substituted at evaluation time
    Symbol(String),
    /// Binary operation
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Unary operation (negation)
    UnaryOp {
        op: UnaryOperator,
        operand: Box<Expr>,
    },
    /// Single-argument function call
    FnCall {
        function: Function,
        arg: Box<Expr>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOperator {
    /// Apply the operator to two numbers with IEEE semantics.
    pub fn apply(&self, l: f64, r: f64) -> f64 {
        match self {
            Self::Add => l + r,
            Self::Sub => l - r,
            Self::Mul => l * r,
            Self::Div => l / r,
            Self::Pow => l.powf(r),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Neg,
}

/// Built-in functions understood by the formula language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Function {
    Sin,
    Cos,
    Tan,
    Asin,
    Acos,
    Atan,
    Sinh,
    Cosh,
    Tanh,
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Sign,
    Floor,
    Ceil,
}

impl Function {
    /// Look a function up by the name used in formulas.
    pub fn from_name(name: &str) -> Option<Self> {
        let function = match name {
            "sin" => Self::Sin,
            "cos" => Self::Cos,
            "tan" => Self::Tan,
            "asin" => Self::Asin,
            "acos" => Self::Acos,
            "atan" => Self::Atan,
            "sinh" => Self::Sinh,
            "cosh" => Self::Cosh,
            "tanh" => Self::Tanh,
            "exp" => Self::Exp,
            // natural logarithm, as in most algebra systems
            "ln" | "log" => Self::Ln,
            "log10" => Self::Log10,
            "sqrt" => Self::Sqrt,
            "abs" => Self::Abs,
            "sign" => Self::Sign,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            _ => return None,
        };
        Some(function)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Sin => "sin",
            Self::Cos => "cos",
            Self::Tan => "tan",
            Self::Asin => "asin",
            Self::Acos => "acos",
            Self::Atan => "atan",
            Self::Sinh => "sinh",
            Self::Cosh => "cosh",
            Self::Tanh => "tanh",
            Self::Exp => "exp",
            Self::Ln => "ln",
            Self::Log10 => "log10",
            Self::Sqrt => "sqrt",
            Self::Abs => "abs",
            Self::Sign => "sign",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
        }
    }

    /// Apply the function to a single number.
    pub fn apply(&self, x: f64) -> f64 {
        match self {
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Asin => x.asin(),
            Self::Acos => x.acos(),
            Self::Atan => x.atan(),
            Self::Sinh => x.sinh(),
            Self::Cosh => x.cosh(),
            Self::Tanh => x.tanh(),
            Self::Exp => x.exp(),
            Self::Ln => x.ln(),
            Self::Log10 => x.log10(),
            Self::Sqrt => x.sqrt(),
            Self::Abs => x.abs(),
            Self::Sign => {
                if x == 0.0 || x.is_nan() {
                    x
                } else {
                    x.signum()
                }
            }
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
        }
    }
}

impl Expr {
    pub fn number(value: f64) -> Self {
        Expr::Number(value)
    }

    pub fn symbol(name: impl Into<String>) -> Self {
        Expr::Symbol(name.into())
    }

    pub fn binary(op: BinaryOperator, left: Expr, right: Expr) -> Self {
        Expr::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn add(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Add, left, right)
    }

    pub fn sub(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Sub, left, right)
    }

    pub fn mul(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Mul, left, right)
    }

    pub fn div(left: Expr, right: Expr) -> Self {
        Self::binary(BinaryOperator::Div, left, right)
    }

    pub fn pow(base: Expr, exponent: Expr) -> Self {
        Self::binary(BinaryOperator::Pow, base, exponent)
    }

    pub fn neg(operand: Expr) -> Self {
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand: Box::new(operand),
        }
    }

    pub fn call(function: Function, arg: Expr) -> Self {
        Expr::FnCall {
            function,
            arg: Box::new(arg),
        }
    }

    /// The free symbols of the expression, in name order.
    pub fn free_symbols(&self) -> BTreeSet<String> {
        let mut symbols = BTreeSet::new();
        self.collect_symbols(&mut symbols);
        symbols
    }

    fn collect_symbols(&self, symbols: &mut BTreeSet<String>) {
        match self {
            Expr::Number(_) => {}
            Expr::Symbol(name) => {
                symbols.insert(name.clone());
            }
            Expr::BinaryOp { left, right, .. } => {
                left.collect_symbols(symbols);
                right.collect_symbols(symbols);
            }
            Expr::UnaryOp { operand, .. } => operand.collect_symbols(symbols),
            Expr::FnCall { arg, .. } => arg.collect_symbols(symbols),
        }
    }

    /// Whether `symbol` occurs anywhere in the expression.
    pub fn depends_on(&self, symbol: &str) -> bool {
        match self {
            Expr::Number(_) => false,
            Expr::Symbol(name) => name == symbol,
            Expr::BinaryOp { left, right, .. } => {
                left.depends_on(symbol) || right.depends_on(symbol)
            }
            Expr::UnaryOp { operand, .. } => operand.depends_on(symbol),
            Expr::FnCall { arg, .. } => arg.depends_on(symbol),
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Expr::Number(n) => Some(*n),
            _ => None,
        }
    }
}
