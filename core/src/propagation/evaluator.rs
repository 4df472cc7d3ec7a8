//! Evaluation of a secondary value: value plus per-channel Gaussian errors.
//!
//! One call runs in four steps:
//! 1. resolve a binding for every free symbol (explicit > dependency > default)
//! 2. determine the broadcast length shared by all array-valued entries
//! 3. evaluate the formula over the resolved value columns
//! 4. for every error channel, sum the squared `df/ds * error_s` terms and
//!    take the square root

use super::error::{PropagationError, PropagationResult};
use super::secondary::SecondaryValue;
use super::types::{Binding, Bindings, DependencyResult, DependencyResults, Estimate, Value};
use crate::expr::Columns;
use nalgebra::DVector;
use std::borrow::Cow;
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// The full outcome of evaluating one node of the dependency tree.
pub(crate) struct Evaluation {
    pub estimate: Estimate,
    pub dependencies: DependencyResults,
}

type Resolved<'a> = BTreeMap<&'a str, Cow<'a, Binding>>;

/// Evaluate `node` for `bindings`.
///
/// `bindings` must already be validated against the node's accepted symbols.
pub(crate) fn evaluate(node: &SecondaryValue, bindings: &Bindings) -> PropagationResult<Evaluation> {
    let (resolved, dependencies) = resolve_bindings(node, bindings)?;

    let broadcast = broadcast_length(&resolved)?;
    let rows = broadcast.unwrap_or(1);
    let channels = resolved.values().map(|b| b.channels()).max().unwrap_or(0);

    let columns: Columns = resolved
        .iter()
        .map(|(symbol, binding)| (symbol.to_string(), binding.value().to_column(rows)))
        .collect();

    let value = node.backend.substitute(node.prepared.expr(), &columns, rows)?;

    // Each partial derivative is evaluated at most once per call, and only
    // for symbols that carry a nonzero error on some channel.
    let mut derivative_columns: BTreeMap<&str, DVector<f64>> = BTreeMap::new();
    let mut errors = Vec::with_capacity(channels);

    for channel in 1..=channels {
        let mut sum_of_squares = DVector::<f64>::zeros(rows);

        for (symbol, binding) in &resolved {
            let Some(error) = binding.error(channel) else {
                continue;
            };
            if error.is_zero() {
                continue;
            }

            if !derivative_columns.contains_key(symbol) {
                let derivative = node.prepared.derivative(symbol).ok_or_else(|| {
                    PropagationError::MissingSymbol {
                        symbol: symbol.to_string(),
                    }
                })?;
                let column = node.backend.substitute(derivative, &columns, rows)?;
                derivative_columns.insert(*symbol, column);
            }
            let derivative = &derivative_columns[symbol];

            // A zero error contributes nothing, even where the derivative is not finite
            let term = derivative.zip_map(&error.to_column(rows), |d, e| {
                if e == 0.0 {
                    0.0
                } else {
                    d * e
                }
            });
            sum_of_squares += term.map(|t| t * t);
        }

        errors.push(Value::from_column(sum_of_squares.map(f64::sqrt)));
    }

    debug!(
        formula = %node,
        rows,
        channels,
        dependencies = dependencies.len(),
        "evaluated secondary value"
    );

    Ok(Evaluation {
        estimate: Estimate::new(Value::from_column(value), errors),
        dependencies,
    })
}

/// Pick the binding of every free symbol, evaluating dependencies that were
/// not overridden by the caller.
fn resolve_bindings<'a>(
    node: &'a SecondaryValue,
    bindings: &'a Bindings,
) -> PropagationResult<(Resolved<'a>, DependencyResults)> {
    let mut resolved = Resolved::new();
    let mut dependency_results = DependencyResults::new();

    for symbol in node.prepared.symbols() {
        let symbol = symbol.as_str();

        let binding = if let Some(explicit) = bindings.get(symbol) {
            Cow::Borrowed(explicit)
        } else if let Some(dependency) = node.dependencies.get(symbol) {
            trace!(symbol, formula = %dependency, "evaluating dependency");
            let forwarded = bindings.restricted_to(dependency.accepted_symbols());
            let nested = evaluate(dependency, &forwarded)?;
            let binding = Binding::from(&nested.estimate);
            dependency_results.insert(
                symbol.to_string(),
                DependencyResult {
                    estimate: nested.estimate,
                    dependencies: nested.dependencies,
                },
            );
            Cow::Owned(binding)
        } else if let Some(default) = node.defaults.get(symbol) {
            Cow::Borrowed(default)
        } else {
            return Err(PropagationError::MissingSymbol {
                symbol: symbol.to_string(),
            });
        };

        resolved.insert(symbol, binding);
    }

    Ok((resolved, dependency_results))
}

/// The common length of every array-valued entry, `None` if all are scalars.
fn broadcast_length(resolved: &Resolved<'_>) -> PropagationResult<Option<usize>> {
    let mut length = None;

    for (symbol, binding) in resolved {
        for entry in binding.entries() {
            let Some(found) = entry.array_len() else {
                continue;
            };
            match length {
                None => length = Some(found),
                Some(expected) if expected != found => {
                    return Err(PropagationError::ShapeMismatch {
                        symbol: symbol.to_string(),
                        expected,
                        found,
                    });
                }
                Some(_) => {}
            }
        }
    }

    Ok(length)
}
