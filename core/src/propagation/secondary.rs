//! The user-facing secondary value: a formula with defaults and dependencies.

use super::error::{PropagationError, PropagationResult};
use super::evaluator;
use super::prepare::{FormulaSource, PreparedFormula};
use super::types::{Binding, Bindings, DependencyResults, Estimate, SymbolTree};
use crate::backend::{default_backend, SymbolicBackend};
use crate::expr::{Expr, FormulaError};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// A quantity computed from a formula, with first-order Gaussian error
/// propagation.
///
/// Immutable after construction: the free symbols and every partial
/// derivative are computed once in [`SecondaryValue::create`]. Instances can
/// be shared (and used as dependencies of several parents) through [`Arc`].
pub struct SecondaryValue {
    pub(crate) prepared: PreparedFormula,
    pub(crate) defaults: Bindings,
    pub(crate) dependencies: BTreeMap<String, Arc<SecondaryValue>>,
    pub(crate) backend: Arc<dyn SymbolicBackend>,
    /// Own free symbols plus everything the dependencies accept, recursively
    accepted: BTreeSet<String>,
}

impl SecondaryValue {
    /// Create a secondary value without defaults or dependencies
    pub fn new(formula: impl Into<FormulaSource>) -> Result<Self, FormulaError> {
        Self::builder(formula).build()
    }

    /// Create a secondary value with default bindings and dependencies.
    ///
    /// Dependencies whose name is not a symbol of the formula are ignored.
    pub fn create(
        formula: impl Into<FormulaSource>,
        defaults: Bindings,
        dependencies: BTreeMap<String, Arc<SecondaryValue>>,
    ) -> Result<Self, FormulaError> {
        SecondaryValueBuilder {
            source: formula.into(),
            defaults,
            dependencies,
            backend: None,
        }
        .build()
    }

    pub fn builder(formula: impl Into<FormulaSource>) -> SecondaryValueBuilder {
        SecondaryValueBuilder {
            source: formula.into(),
            defaults: Bindings::new(),
            dependencies: BTreeMap::new(),
            backend: None,
        }
    }

    /// Compute the value and the propagated error of every channel.
    pub fn evaluate(&self, bindings: &Bindings) -> PropagationResult<Estimate> {
        self.validate(bindings)?;
        Ok(evaluator::evaluate(self, bindings)?.estimate)
    }

    /// Like [`evaluate`](Self::evaluate), also returning the results of every
    /// dependency that was computed rather than overridden by `bindings`.
    pub fn evaluate_with_dependencies(
        &self,
        bindings: &Bindings,
    ) -> PropagationResult<(Estimate, DependencyResults)> {
        self.validate(bindings)?;
        let evaluation = evaluator::evaluate(self, bindings)?;
        Ok((evaluation.estimate, evaluation.dependencies))
    }

    /// Reject bindings that nothing in the dependency tree would consume
    fn validate(&self, bindings: &Bindings) -> PropagationResult<()> {
        match bindings.names().find(|name| !self.accepted.contains(*name)) {
            Some(unknown) => Err(PropagationError::UnknownSymbol {
                symbol: unknown.to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn formula(&self) -> &Expr {
        self.prepared.expr()
    }

    /// Free symbols of this formula
    pub fn symbols(&self) -> &BTreeSet<String> {
        self.prepared.symbols()
    }

    /// Every symbol a call may bind: own symbols and those of all dependencies
    pub fn accepted_symbols(&self) -> &BTreeSet<String> {
        &self.accepted
    }

    /// Free symbols, with dependency-bound symbols expanded into the symbols
    /// of their dependency.
    pub fn symbol_tree(&self) -> SymbolTree {
        self.symbols()
            .iter()
            .map(|symbol| {
                let subtree = self
                    .dependencies
                    .get(symbol)
                    .map(|dependency| dependency.symbol_tree())
                    .unwrap_or_default();
                (symbol.as_str(), subtree)
            })
            .collect()
    }

    pub fn defaults(&self) -> &Bindings {
        &self.defaults
    }

    pub fn dependency(&self, symbol: &str) -> Option<&Arc<SecondaryValue>> {
        self.dependencies.get(symbol)
    }

    pub fn dependencies(&self) -> impl Iterator<Item = (&str, &Arc<SecondaryValue>)> {
        self.dependencies
            .iter()
            .map(|(symbol, dependency)| (symbol.as_str(), dependency))
    }

    /// The prepared partial derivative with respect to `symbol`
    pub fn derivative(&self, symbol: &str) -> Option<&Expr> {
        self.prepared.derivative(symbol)
    }

    /// Symbolic Gaussian error propagation over `variables`, for inspection.
    ///
    /// The error of variable `v` appears as the symbol `Delta_v`, suffixed
    /// with `_` if the formula already uses that name.
    pub fn gauss_propagation(&self, variables: &[&str]) -> PropagationResult<Expr> {
        self.prepared.gauss_propagation(variables, self.backend.as_ref())
    }
}

impl fmt::Display for SecondaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.prepared.expr())
    }
}

impl fmt::Debug for SecondaryValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecondaryValue")
            .field("formula", &self.prepared.expr().to_string())
            .field("defaults", &self.defaults)
            .field("dependencies", &self.dependencies)
            .finish()
    }
}

/// Step-by-step construction of a [`SecondaryValue`].
pub struct SecondaryValueBuilder {
    source: FormulaSource,
    defaults: Bindings,
    dependencies: BTreeMap<String, Arc<SecondaryValue>>,
    backend: Option<Arc<dyn SymbolicBackend>>,
}

impl SecondaryValueBuilder {
    pub fn default(mut self, symbol: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.defaults.insert(symbol, binding);
        self
    }

    pub fn defaults(mut self, defaults: Bindings) -> Self {
        self.defaults
            .extend(defaults.iter().map(|(name, binding)| (name, binding.clone())));
        self
    }

    pub fn dependency(
        mut self,
        symbol: impl Into<String>,
        dependency: impl Into<Arc<SecondaryValue>>,
    ) -> Self {
        self.dependencies.insert(symbol.into(), dependency.into());
        self
    }

    /// Use a different symbolic backend than [`default_backend`]
    pub fn backend(mut self, backend: Arc<dyn SymbolicBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn build(self) -> Result<SecondaryValue, FormulaError> {
        let backend = self.backend.unwrap_or_else(default_backend);
        let prepared = PreparedFormula::prepare(self.source, backend.as_ref())?;
        let symbols = prepared.symbols();

        let mut dependencies = self.dependencies;
        dependencies.retain(|name, _| {
            let used = symbols.contains(name);
            if !used {
                warn!(symbol = %name, formula = %prepared.expr(), "ignoring dependency for a symbol the formula does not use");
            }
            used
        });

        for name in self.defaults.names().filter(|name| !symbols.contains(*name)) {
            warn!(symbol = %name, formula = %prepared.expr(), "default given for a symbol the formula does not use");
        }

        let mut accepted = symbols.clone();
        for dependency in dependencies.values() {
            accepted.extend(dependency.accepted_symbols().iter().cloned());
        }

        debug!(
            formula = %prepared.expr(),
            dependencies = dependencies.len(),
            defaults = self.defaults.len(),
            "built secondary value"
        );

        Ok(SecondaryValue {
            prepared,
            defaults: self.defaults,
            dependencies,
            backend,
            accepted,
        })
    }
}
