use secval_core::propagation::{Binding, Bindings, PropagationError, SecondaryValue, Value};
use secval_core::{Catalog, Expr};
use std::sync::Arc;

fn scalar(value: &Value) -> f64 {
    value.as_scalar().unwrap()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-10,
        "expected {}, got {}",
        expected,
        actual
    );
}

/// Deterministic stand-in for random samples in [0, 1)
fn samples(count: usize) -> impl Iterator<Item = f64> {
    (0..count).map(|i| ((i as f64 + 0.5) * 0.618_033_988_749_895).fract())
}

#[test]
fn test_product_plus_offset_without_errors() {
    let x = SecondaryValue::new("a*b+c").unwrap();
    let result = x
        .evaluate(&Bindings::new().with("a", 1.2).with("b", 7.9).with("c", 10.0))
        .unwrap();

    assert_eq!(result.as_slice(), &[Value::Scalar(1.2 * 7.9 + 10.0)]);
}

#[test]
fn test_product_plus_offset_with_errors() {
    let x = SecondaryValue::new("a*b+c").unwrap();
    let values: Vec<f64> = samples(60).collect();

    for chunk in values.chunks(6) {
        let (a, da, b, db, c, dc) = (chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5]);
        let result = x
            .evaluate(
                &Bindings::new()
                    .with("a", (a, da))
                    .with("b", (b, db))
                    .with("c", (c, dc)),
            )
            .unwrap();

        assert_close(scalar(result.value()), a * b + c);
        assert_close(
            scalar(&result[1]),
            ((a * db).powi(2) + (da * b).powi(2) + dc.powi(2)).sqrt(),
        );
    }
}

#[test]
fn test_symbols_without_dependencies() {
    let x = SecondaryValue::new("a*b+c").unwrap();
    let tree = x.symbol_tree();

    assert_eq!(tree.iter().map(|(name, _)| name).collect::<Vec<_>>(), vec!["a", "b", "c"]);
    assert!(tree.iter().all(|(_, subtree)| subtree.is_empty()));

    let (_, dependencies) = x
        .evaluate_with_dependencies(&Bindings::new().with("a", 1.0).with("b", 1.0).with("c", 1.0))
        .unwrap();
    assert!(dependencies.is_empty());
}

#[test]
fn test_binding_unknown_name_fails() {
    let x = SecondaryValue::new("a*b+c").unwrap();
    assert!(matches!(
        x.evaluate(&Bindings::new().with("u", 1.0)),
        Err(PropagationError::UnknownSymbol { .. })
    ));
}

fn passthrough() -> SecondaryValue {
    let x = SecondaryValue::new("b").unwrap();
    SecondaryValue::builder("a + x").dependency("x", x).build().unwrap()
}

#[test]
fn test_overriding_dependency() {
    let y = passthrough();
    let (result, dependencies) = y
        .evaluate_with_dependencies(&Bindings::new().with("a", 1.0).with("x", 1.0))
        .unwrap();

    assert!(dependencies.is_empty());
    assert_eq!(result.value(), &Value::Scalar(2.0));
}

#[test]
fn test_computing_dependency() {
    let y = passthrough();
    let (result, dependencies) = y
        .evaluate_with_dependencies(&Bindings::new().with("a", 1.0).with("b", 2.0))
        .unwrap();

    assert_eq!(result.value(), &Value::Scalar(3.0));
    assert_eq!(dependencies["x"].estimate.as_slice(), &[Value::Scalar(2.0)]);
    assert!(dependencies["x"].dependencies.is_empty());
}

#[test]
fn test_dependency_errors() {
    let y = passthrough();
    let values: Vec<f64> = samples(40).collect();

    for chunk in values.chunks(4) {
        let (a, da, b, db) = (chunk[0], chunk[1], chunk[2], -chunk[3]);
        let (result, dependencies) = y
            .evaluate_with_dependencies(&Bindings::new().with("a", (a, da)).with("b", (b, db)))
            .unwrap();

        assert_close(scalar(result.value()), a + b);
        assert_close(scalar(&result[1]), (db.powi(2) + da.powi(2)).sqrt());

        let x = &dependencies["x"].estimate;
        assert_close(scalar(x.value()), b);
        assert_close(scalar(&x[1]), db.abs());
    }
}

#[test]
fn test_vectorized_through_dependency() {
    let y = passthrough();
    let result = y
        .evaluate(&Bindings::new().with("a", vec![1.0, 2.0]).with("b", 2.0))
        .unwrap();

    assert_eq!(result.value(), &Value::Array(vec![3.0, 4.0]));
}

#[test]
fn test_array_values_on_both_sides() {
    let y = passthrough();

    let mixed = y
        .evaluate(&Bindings::new().with("a", vec![1.0, 2.0, 3.0]).with("b", 0.0))
        .unwrap();
    assert_eq!(mixed.value(), &Value::Array(vec![1.0, 2.0, 3.0]));

    let both = y
        .evaluate(
            &Bindings::new()
                .with("a", vec![1.0, 2.0, 3.0])
                .with("b", vec![1.0, 2.0, 3.0]),
        )
        .unwrap();
    assert_eq!(both.value(), &Value::Array(vec![2.0, 4.0, 6.0]));
}

#[test]
fn test_defaults_fill_missing() {
    let y = SecondaryValue::builder("a + b").default("a", (1.0, 2.0)).build().unwrap();
    let result = y.evaluate(&Bindings::new().with("b", 1.0)).unwrap();

    assert_eq!(result.as_slice(), &[Value::Scalar(2.0), Value::Scalar(2.0)]);
}

#[test]
fn test_systematic_and_statistical_channels() {
    // Resistance from voltage and current, each with a statistical and a
    // systematic error channel
    let resistance = SecondaryValue::new("U/I").unwrap();
    let result = resistance
        .evaluate(
            &Bindings::new()
                .with("U", Binding::new(vec![10.0, 20.0]).with_error(0.1).with_error(0.2))
                .with("I", Binding::new(vec![2.0, 4.0]).with_error(0.05)),
        )
        .unwrap();

    assert_eq!(result.channels(), 2);
    let value = result.value().as_slice().unwrap();
    assert_close(value[0], 5.0);
    assert_close(value[1], 5.0);

    let statistical = result[1].as_slice().unwrap();
    let expected_0 = ((0.1f64 / 2.0).powi(2) + (10.0 * 0.05 / 4.0f64).powi(2)).sqrt();
    let expected_1 = ((0.1f64 / 4.0).powi(2) + (20.0 * 0.05 / 16.0f64).powi(2)).sqrt();
    assert_close(statistical[0], expected_0);
    assert_close(statistical[1], expected_1);

    let systematic = result[2].as_slice().unwrap();
    assert_close(systematic[0], 0.2 / 2.0);
    assert_close(systematic[1], 0.2 / 4.0);
}

#[test]
fn test_shared_dependency_across_threads() {
    let velocity = Arc::new(SecondaryValue::new("s/t").unwrap());
    let energy = Arc::new(
        SecondaryValue::builder("m*v**2/2")
            .dependency("v", velocity)
            .build()
            .unwrap(),
    );

    let handles: Vec<_> = (1..=4)
        .map(|m| {
            let energy = energy.clone();
            std::thread::spawn(move || {
                let bindings = Bindings::new()
                    .with("m", m as f64)
                    .with("s", (10.0, 0.1))
                    .with("t", 2.0);
                energy.evaluate(&bindings).unwrap()
            })
        })
        .collect();

    for (m, handle) in (1..=4).zip(handles) {
        let result = handle.join().unwrap();
        let m = m as f64;
        // v = 5 +- 0.05, dE/dv = m*v
        assert_close(scalar(result.value()), m * 12.5);
        assert_close(scalar(&result[1]), m * 5.0 * 0.05);
    }
}

#[test]
fn test_catalog_matches_builder() {
    let catalog = Catalog::from_json(
        r#"{"quantities": {
            "x": {"formula": "b"},
            "y": {"formula": "a + x", "dependencies": {"x": "x"}}
        }}"#,
    )
    .unwrap();

    let bindings = Bindings::new().with("a", (1.0, 0.3)).with("b", (2.0, 0.4));
    let from_catalog = catalog.evaluate("y", &bindings).unwrap();
    let from_builder = passthrough().evaluate(&bindings).unwrap();

    assert_eq!(from_catalog, from_builder);
    assert_close(scalar(&from_catalog[1]), 0.5);
}

#[test]
fn test_propagation_formula_export() {
    let y = SecondaryValue::new("a*b").unwrap();
    let formula: Expr = y.gauss_propagation(&["a", "b"]).unwrap();

    assert_eq!(formula.to_string(), "sqrt((b*Delta_a)^2 + (a*Delta_b)^2)");
}
