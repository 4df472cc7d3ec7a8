//! Tests for differentiation, simplification, rendering and evaluation.

use super::*;
use nalgebra::DVector;

fn parse(text: &str) -> Expr {
    parse_expression(text).unwrap()
}

fn eval_at(expr: &Expr, values: &[(&str, f64)]) -> f64 {
    let columns: Columns = values
        .iter()
        .map(|(name, value)| (name.to_string(), DVector::from_element(1, *value)))
        .collect();
    evaluate_columns(expr, &columns, 1).unwrap()[0]
}

#[test]
fn test_derivative_of_square() {
    let derivative = differentiate(&parse("a**2"), "a").unwrap();
    assert_eq!(derivative, Expr::mul(Expr::number(2.0), Expr::symbol("a")));
    assert_eq!(derivative.to_string(), "2*a");
}

#[test]
fn test_derivative_of_product_sum() {
    let expr = parse("a*b + c");
    assert_eq!(differentiate(&expr, "a").unwrap(), Expr::symbol("b"));
    assert_eq!(differentiate(&expr, "b").unwrap(), Expr::symbol("a"));
    assert_eq!(differentiate(&expr, "c").unwrap(), Expr::number(1.0));
}

#[test]
fn test_derivative_of_absent_symbol_is_zero() {
    let derivative = differentiate(&parse("sin(a) * b"), "z").unwrap();
    assert_eq!(derivative, Expr::number(0.0));
}

#[test]
fn test_derivatives_match_finite_differences() {
    let formulas = [
        "sin(a)*exp(b)",
        "a**b",
        "sqrt(a)/b",
        "log10(a) + ln(b)",
        "atan(a/b)",
        "tanh(a) - acos(b/3)",
        "abs(a - b)",
        "cos(a)^2 + tan(b)",
        "asin(a/2) * cosh(b) - sinh(a)",
        "2**a / b**3",
    ];
    let (a, b) = (0.7, 1.3);
    let h = 1e-6;

    for formula in formulas {
        let expr = parse(formula);
        for symbol in ["a", "b"] {
            let derivative = differentiate(&expr, symbol).unwrap();
            let analytic = eval_at(&derivative, &[("a", a), ("b", b)]);

            let shifted = |delta: f64| {
                let (a, b) = if symbol == "a" { (a + delta, b) } else { (a, b + delta) };
                eval_at(&expr, &[("a", a), ("b", b)])
            };
            let numeric = (shifted(h) - shifted(-h)) / (2.0 * h);

            assert!(
                (analytic - numeric).abs() < 1e-5 * (1.0 + numeric.abs()),
                "d({})/d{}: analytic {} vs numeric {}",
                formula,
                symbol,
                analytic,
                numeric
            );
        }
    }
}

#[test]
fn test_step_functions_are_not_differentiable() {
    let err = differentiate(&parse("a * floor(b)"), "b").unwrap_err();
    assert_eq!(
        err,
        FormulaError::NotDifferentiable {
            function: "floor".to_string(),
            symbol: "b".to_string()
        }
    );

    // The step function does not depend on `a`, so this one is fine
    let derivative = differentiate(&parse("a * floor(b)"), "a").unwrap();
    assert_eq!(derivative.to_string(), "floor(b)");
}

#[test]
fn test_simplify_neutral_elements() {
    assert_eq!(simplify(&parse("0*a + 1*b")), Expr::symbol("b"));
    assert_eq!(simplify(&parse("a - a")), Expr::number(0.0));
    assert_eq!(simplify(&parse("a^1 + b^0")), parse("a + 1"));
    assert_eq!(simplify(&parse("-(-a)")), Expr::symbol("a"));
}

#[test]
fn test_simplify_moves_numbers_forward() {
    assert_eq!(simplify(&parse("a*2")).to_string(), "2*a");
    assert_eq!(simplify(&parse("2*(3*a)")).to_string(), "6*a");
    assert_eq!(simplify(&parse("a + -b")).to_string(), "a - b");
}

#[test]
fn test_simplify_keeps_non_finite_folds_symbolic() {
    let simplified = simplify(&parse("1/0"));
    assert_eq!(simplified, Expr::div(Expr::number(1.0), Expr::number(0.0)));
}

#[test]
fn test_display_parenthesization() {
    assert_eq!(parse("a - (b + c)").to_string(), "a - (b + c)");
    assert_eq!(parse("a/(b*c)").to_string(), "a/(b*c)");
    assert_eq!(parse("(a*b)^2").to_string(), "(a*b)^2");
    assert_eq!(parse("-a**2").to_string(), "-a^2");
    assert_eq!(parse("(-a)**2").to_string(), "(-a)^2");
    assert_eq!(parse("a**-b").to_string(), "a^(-b)");
    assert_eq!(parse("sqrt(a + b)*c").to_string(), "sqrt(a + b)*c");
}

#[test]
fn test_display_reparses_to_same_value() {
    let formulas = [
        "a - (b - c)",
        "a/(b/c)",
        "-(a + b)*c",
        "a**b**c",
        "(a**b)**c",
        "exp(-a/b) - c",
        "a*-b",
    ];
    let values = [("a", 1.7), ("b", 0.4), ("c", 2.2)];

    for formula in formulas {
        let expr = parse(formula);
        let reparsed = parse(&expr.to_string());
        let expected = eval_at(&expr, &values);
        let actual = eval_at(&reparsed, &values);
        assert!((expected - actual).abs() < 1e-12, "{} -> {}", formula, expr);
    }
}

#[test]
fn test_evaluate_columns_vectorized() {
    let mut columns = Columns::new();
    columns.insert("a".to_string(), DVector::from_vec(vec![1.0, 2.0, 3.0]));
    columns.insert("b".to_string(), DVector::from_element(3, 1.0));

    let result = evaluate_columns(&parse("a**2 + b"), &columns, 3).unwrap();
    assert_eq!(result.as_slice(), &[2.0, 5.0, 10.0]);
}

#[test]
fn test_evaluate_columns_ieee_semantics() {
    let value = eval_at(&parse("a / b"), &[("a", 1.0), ("b", 0.0)]);
    assert!(value.is_infinite());

    let value = eval_at(&parse("sqrt(a)"), &[("a", -1.0)]);
    assert!(value.is_nan());
}

#[test]
fn test_evaluate_columns_unbound_symbol() {
    let err = evaluate_columns(&parse("a + b"), &Columns::new(), 1).unwrap_err();
    assert_eq!(err, UnboundSymbol("a".to_string()));
}

#[test]
fn test_free_symbols_are_ordered() {
    let symbols: Vec<_> = parse("z*y + sin(x) - y").free_symbols().into_iter().collect();
    assert_eq!(symbols, vec!["x", "y", "z"]);
}
