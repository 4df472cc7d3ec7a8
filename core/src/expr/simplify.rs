//! Bottom-up algebraic simplification.
//!
//! Only rewrites that are exact for finite inputs: constant folding,
//! neutral/absorbing elements and sign normalisation. Function calls on
//! constants are kept symbolic so rendered formulas stay readable.

use super::{BinaryOperator, Expr, UnaryOperator};

pub fn simplify(expr: &Expr) -> Expr {
    match expr {
        Expr::Number(_) | Expr::Symbol(_) => expr.clone(),

        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => negate(simplify(operand)),

        Expr::FnCall { function, arg } => Expr::call(*function, simplify(arg)),

        Expr::BinaryOp { op, left, right } => {
            let left = simplify(left);
            let right = simplify(right);

            if let (Some(l), Some(r)) = (left.as_number(), right.as_number()) {
                let folded = op.apply(l, r);
                if folded.is_finite() {
                    return Expr::Number(folded);
                }
            }

            match op {
                BinaryOperator::Add => simplify_add(left, right),
                BinaryOperator::Sub => simplify_sub(left, right),
                BinaryOperator::Mul => simplify_mul(left, right),
                BinaryOperator::Div => simplify_div(left, right),
                BinaryOperator::Pow => simplify_pow(left, right),
            }
        }
    }
}

fn is_number(expr: &Expr, value: f64) -> bool {
    expr.as_number() == Some(value)
}

fn negate(expr: Expr) -> Expr {
    match expr {
        Expr::Number(n) => Expr::Number(-n),
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => *operand,
        other => Expr::neg(other),
    }
}

/// Split a leading negation off an expression, if any.
fn strip_negation(expr: Expr) -> Result<Expr, Expr> {
    match expr {
        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => Ok(*operand),
        Expr::Number(n) if n < 0.0 => Ok(Expr::Number(-n)),
        other => Err(other),
    }
}

fn simplify_add(left: Expr, right: Expr) -> Expr {
    if is_number(&left, 0.0) {
        return right;
    }
    if is_number(&right, 0.0) {
        return left;
    }
    match strip_negation(right) {
        Ok(positive) => Expr::sub(left, positive),
        Err(right) => Expr::add(left, right),
    }
}

fn simplify_sub(left: Expr, right: Expr) -> Expr {
    if is_number(&right, 0.0) {
        return left;
    }
    if is_number(&left, 0.0) {
        return negate(right);
    }
    if left == right {
        return Expr::Number(0.0);
    }
    match strip_negation(right) {
        Ok(positive) => Expr::add(left, positive),
        Err(right) => Expr::sub(left, right),
    }
}

fn simplify_mul(left: Expr, right: Expr) -> Expr {
    if is_number(&left, 0.0) || is_number(&right, 0.0) {
        return Expr::Number(0.0);
    }
    if is_number(&left, 1.0) {
        return right;
    }
    if is_number(&right, 1.0) {
        return left;
    }
    if is_number(&left, -1.0) {
        return negate(right);
    }
    if is_number(&right, -1.0) {
        return negate(left);
    }

    // Keep numeric factors in front: x*2 -> 2*x, 2*(3*x) -> 6*x
    match (left, right) {
        (left, Expr::Number(n)) if left.as_number().is_none() => {
            simplify_mul(Expr::Number(n), left)
        }
        (
            Expr::Number(n),
            Expr::BinaryOp {
                op: BinaryOperator::Mul,
                left: inner_left,
                right: inner_right,
            },
        ) => match *inner_left {
            Expr::Number(m) => simplify_mul(Expr::Number(n * m), *inner_right),
            inner_left => Expr::mul(Expr::Number(n), Expr::mul(inner_left, *inner_right)),
        },
        (Expr::UnaryOp { operand, .. }, right) => negate(simplify_mul(*operand, right)),
        (left, Expr::UnaryOp { operand, .. }) => negate(simplify_mul(left, *operand)),
        (left, right) => Expr::mul(left, right),
    }
}

fn simplify_div(left: Expr, right: Expr) -> Expr {
    if is_number(&right, 1.0) {
        return left;
    }
    if is_number(&left, 0.0) && !is_number(&right, 0.0) {
        return Expr::Number(0.0);
    }
    Expr::div(left, right)
}

fn simplify_pow(base: Expr, exponent: Expr) -> Expr {
    if is_number(&exponent, 1.0) {
        return base;
    }
    if is_number(&exponent, 0.0) || is_number(&base, 1.0) {
        return Expr::Number(1.0);
    }
    Expr::pow(base, exponent)
}
