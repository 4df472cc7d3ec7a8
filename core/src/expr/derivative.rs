//! Symbolic differentiation.

use super::simplify::simplify;
use super::{BinaryOperator, Expr, FormulaError, Function, UnaryOperator};

/// Differentiate `expr` with respect to `symbol` and simplify the result.
///
/// Fails with [`FormulaError::NotDifferentiable`] when the derivative would
/// have to pass through a step function (`sign`, `floor`, `ceil`) whose
/// argument depends on `symbol`.
pub fn differentiate(expr: &Expr, symbol: &str) -> Result<Expr, FormulaError> {
    Ok(simplify(&derive(expr, symbol)?))
}

fn derive(expr: &Expr, symbol: &str) -> Result<Expr, FormulaError> {
    if !expr.depends_on(symbol) {
        return Ok(Expr::Number(0.0));
    }

    match expr {
        Expr::Number(_) => Ok(Expr::Number(0.0)),
        // depends_on() already established that this is `symbol`
        Expr::Symbol(_) => Ok(Expr::Number(1.0)),

        Expr::BinaryOp { op, left, right } => {
            let u = left.as_ref();
            let v = right.as_ref();
            let du = derive(u, symbol)?;
            let dv = derive(v, symbol)?;

            let derivative = match op {
                BinaryOperator::Add => Expr::add(du, dv),
                BinaryOperator::Sub => Expr::sub(du, dv),
                BinaryOperator::Mul => Expr::add(
                    Expr::mul(du, v.clone()),
                    Expr::mul(u.clone(), dv),
                ),
                BinaryOperator::Div => Expr::div(
                    Expr::sub(Expr::mul(du, v.clone()), Expr::mul(u.clone(), dv)),
                    Expr::pow(v.clone(), Expr::number(2.0)),
                ),
                BinaryOperator::Pow => power_rule(expr, u, v, du, dv, symbol),
            };
            Ok(derivative)
        }

        Expr::UnaryOp {
            op: UnaryOperator::Neg,
            operand,
        } => Ok(Expr::neg(derive(operand, symbol)?)),

        Expr::FnCall { function, arg } => {
            let outer = outer_derivative(*function, arg, symbol)?;
            let inner = derive(arg, symbol)?;
            Ok(Expr::mul(outer, inner))
        }
    }
}

/// d(u^v) for the three cases: constant exponent, constant base, both varying.
fn power_rule(expr: &Expr, u: &Expr, v: &Expr, du: Expr, dv: Expr, symbol: &str) -> Expr {
    if !v.depends_on(symbol) {
        // v * u^(v - 1) * u'
        let lowered = match v.as_number() {
            Some(n) => Expr::number(n - 1.0),
            None => Expr::sub(v.clone(), Expr::number(1.0)),
        };
        Expr::mul(Expr::mul(v.clone(), Expr::pow(u.clone(), lowered)), du)
    } else if !u.depends_on(symbol) {
        // u^v * ln(u) * v'
        Expr::mul(
            Expr::mul(expr.clone(), Expr::call(Function::Ln, u.clone())),
            dv,
        )
    } else {
        // u^v * (v' ln(u) + v u' / u)
        Expr::mul(
            expr.clone(),
            Expr::add(
                Expr::mul(dv, Expr::call(Function::Ln, u.clone())),
                Expr::div(Expr::mul(v.clone(), du), u.clone()),
            ),
        )
    }
}

/// f'(u) for a built-in function f, before the chain-rule factor u'.
fn outer_derivative(function: Function, u: &Expr, symbol: &str) -> Result<Expr, FormulaError> {
    let u = u.clone();
    let one = || Expr::number(1.0);
    let squared = |e: Expr| Expr::pow(e, Expr::number(2.0));

    let outer = match function {
        Function::Sin => Expr::call(Function::Cos, u),
        Function::Cos => Expr::neg(Expr::call(Function::Sin, u)),
        Function::Tan => Expr::add(one(), squared(Expr::call(Function::Tan, u))),
        Function::Asin => Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), squared(u))),
        ),
        Function::Acos => Expr::neg(Expr::div(
            one(),
            Expr::call(Function::Sqrt, Expr::sub(one(), squared(u))),
        )),
        Function::Atan => Expr::div(one(), Expr::add(one(), squared(u))),
        Function::Sinh => Expr::call(Function::Cosh, u),
        Function::Cosh => Expr::call(Function::Sinh, u),
        Function::Tanh => Expr::sub(one(), squared(Expr::call(Function::Tanh, u))),
        Function::Exp => Expr::call(Function::Exp, u),
        Function::Ln => Expr::div(one(), u),
        Function::Log10 => Expr::div(
            one(),
            Expr::mul(u, Expr::number(std::f64::consts::LN_10)),
        ),
        Function::Sqrt => Expr::div(
            one(),
            Expr::mul(Expr::number(2.0), Expr::call(Function::Sqrt, u)),
        ),
        Function::Abs => Expr::call(Function::Sign, u),
        Function::Sign | Function::Floor | Function::Ceil => {
            return Err(FormulaError::NotDifferentiable {
                function: function.name().to_string(),
                symbol: symbol.to_string(),
            })
        }
    };

    Ok(outer)
}
