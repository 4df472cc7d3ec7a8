//! Expression preparation: parse once, differentiate once per free symbol.

use super::error::{PropagationError, PropagationResult};
use crate::backend::SymbolicBackend;
use crate::expr::{Expr, FormulaError, Function};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Where a formula comes from: text to parse, or a ready expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FormulaSource {
    Text(String),
    Expr(Expr),
}

impl From<&str> for FormulaSource {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for FormulaSource {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Expr> for FormulaSource {
    fn from(expr: Expr) -> Self {
        Self::Expr(expr)
    }
}

/// A formula together with its free symbols and one partial derivative per
/// free symbol. Immutable once prepared.
///
/// Symbols that name dependencies stay plain symbols here: dependencies are
/// evaluated separately and substituted numerically.
#[derive(Debug, Clone)]
pub struct PreparedFormula {
    expr: Expr,
    symbols: BTreeSet<String>,
    derivatives: BTreeMap<String, Expr>,
}

impl PreparedFormula {
    pub fn prepare(
        source: FormulaSource,
        backend: &dyn SymbolicBackend,
    ) -> Result<Self, FormulaError> {
        let expr = match source {
            FormulaSource::Text(text) => backend.parse(&text)?,
            FormulaSource::Expr(expr) => expr,
        };
        let symbols = expr.free_symbols();

        let derivatives = symbols
            .iter()
            .map(|symbol| Ok((symbol.clone(), backend.differentiate(&expr, symbol)?)))
            .collect::<Result<BTreeMap<_, _>, FormulaError>>()?;

        debug!(formula = %expr, symbols = ?symbols, "prepared formula");

        Ok(Self {
            expr,
            symbols,
            derivatives,
        })
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Free symbols, in name order
    pub fn symbols(&self) -> &BTreeSet<String> {
        &self.symbols
    }

    pub fn derivative(&self, symbol: &str) -> Option<&Expr> {
        self.derivatives.get(symbol)
    }

    /// Symbolic Gaussian propagation `sqrt(sum((df/dv * Delta_v)^2))` over
    /// the given variables.
    ///
    /// The error of `v` is named `Delta_v`, with `_` appended until the name
    /// clashes neither with a formula symbol nor with another error.
    pub fn gauss_propagation(
        &self,
        variables: &[&str],
        backend: &dyn SymbolicBackend,
    ) -> PropagationResult<Expr> {
        let mut taken = self.symbols.clone();
        let mut terms = Vec::with_capacity(variables.len());
        for variable in variables {
            let derivative =
                self.derivative(variable)
                    .ok_or_else(|| PropagationError::UnknownSymbol {
                        symbol: variable.to_string(),
                    })?;
            let delta = Expr::symbol(error_placeholder(variable, &mut taken));
            let scaled = backend.simplify(&Expr::mul(derivative.clone(), delta));
            terms.push(Expr::pow(scaled, Expr::number(2.0)));
        }

        let sum = terms.into_iter().reduce(Expr::add);
        Ok(match sum {
            Some(sum) => Expr::call(Function::Sqrt, sum),
            None => Expr::number(0.0),
        })
    }
}

/// A fresh `Delta_` name for the error of `variable`, reserved in `taken`
fn error_placeholder(variable: &str, taken: &mut BTreeSet<String>) -> String {
    let mut name = format!("Delta_{}", variable);
    while taken.contains(&name) {
        name.push('_');
    }
    taken.insert(name.clone());
    name
}
