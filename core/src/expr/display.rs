use super::{BinaryOperator, Expr, UnaryOperator};
use std::fmt;

// Binding strength used to decide where parentheses are needed
const ADDITIVE: u8 = 1;
const MULTIPLICATIVE: u8 = 2;
const UNARY: u8 = 3;
const POWER: u8 = 4;
const ATOM: u8 = 5;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Number(n) if *n < 0.0 => UNARY,
        Expr::Number(_) | Expr::Symbol(_) | Expr::FnCall { .. } => ATOM,
        Expr::UnaryOp { .. } => UNARY,
        Expr::BinaryOp { op, .. } => match op {
            BinaryOperator::Add | BinaryOperator::Sub => ADDITIVE,
            BinaryOperator::Mul | BinaryOperator::Div => MULTIPLICATIVE,
            BinaryOperator::Pow => POWER,
        },
    }
}

fn write_operand(f: &mut fmt::Formatter<'_>, expr: &Expr, min_precedence: u8) -> fmt::Result {
    if precedence(expr) < min_precedence {
        write!(f, "({})", expr)
    } else {
        write!(f, "{}", expr)
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Symbol(name) => write!(f, "{}", name),
            Expr::UnaryOp {
                op: UnaryOperator::Neg,
                operand,
            } => {
                write!(f, "-")?;
                write_operand(f, operand, POWER)
            }
            Expr::FnCall { function, arg } => write!(f, "{}({})", function.name(), arg),
            Expr::BinaryOp { op, left, right } => {
                let (symbol, left_min, right_min) = match op {
                    BinaryOperator::Add => (" + ", ADDITIVE, ADDITIVE),
                    BinaryOperator::Sub => (" - ", ADDITIVE, MULTIPLICATIVE),
                    BinaryOperator::Mul => ("*", MULTIPLICATIVE, MULTIPLICATIVE),
                    BinaryOperator::Div => ("/", MULTIPLICATIVE, UNARY),
                    BinaryOperator::Pow => ("^", ATOM, POWER),
                };
                write_operand(f, left, left_min)?;
                write!(f, "{}", symbol)?;
                write_operand(f, right, right_min)
            }
        }
    }
}
