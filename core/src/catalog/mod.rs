//! Named quantities loaded from a JSON catalog.
//!
//! Quantities refer to each other by name. Every quantity is built once,
//! depth-first, so a quantity used by several others is shared through an
//! [`Arc`]. References to undefined quantities and dependency cycles are
//! reported with the names involved.

pub mod types;


pub use types::{CatalogDocument, QuantityDefinition};

use crate::expr::FormulaError;
use crate::propagation::{
    Bindings, DependencyResults, Estimate, PropagationError, SecondaryValue,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog: {0}")]
    Json(#[from] serde_json::Error),

    #[error("quantity '{referenced_by}' depends on unknown quantity '{name}'")]
    UnknownQuantity { name: String, referenced_by: String },

    #[error("circular dependency: {}", .0.join(" -> "))]
    CircularDependency(Vec<String>),

    #[error("quantity '{quantity}': {source}")]
    Formula {
        quantity: String,
        #[source]
        source: FormulaError,
    },

    #[error("no quantity named '{0}'")]
    NotFound(String),

    #[error(transparent)]
    Propagation(#[from] PropagationError),
}

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Built quantities, ready for evaluation
#[derive(Debug, Default)]
pub struct Catalog {
    quantities: BTreeMap<String, Arc<SecondaryValue>>,
    descriptions: BTreeMap<String, String>,
}

impl Catalog {
    pub fn from_json(text: &str) -> CatalogResult<Self> {
        let document: CatalogDocument = serde_json::from_str(text)?;
        Self::from_document(&document)
    }

    pub fn from_document(document: &CatalogDocument) -> CatalogResult<Self> {
        let mut resolver = Resolver::new(document);
        for name in document.quantities.keys() {
            resolver.resolve(name)?;
        }

        let descriptions = document
            .quantities
            .iter()
            .filter_map(|(name, definition)| {
                definition
                    .description
                    .as_ref()
                    .map(|description| (name.clone(), description.clone()))
            })
            .collect();

        debug!(quantities = resolver.built.len(), "loaded catalog");

        Ok(Self {
            quantities: resolver.built,
            descriptions,
        })
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SecondaryValue>> {
        self.quantities.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.quantities.keys().map(String::as_str)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.quantities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quantities.is_empty()
    }

    pub fn evaluate(&self, name: &str, bindings: &Bindings) -> CatalogResult<Estimate> {
        Ok(self.lookup(name)?.evaluate(bindings)?)
    }

    pub fn evaluate_with_dependencies(
        &self,
        name: &str,
        bindings: &Bindings,
    ) -> CatalogResult<(Estimate, DependencyResults)> {
        Ok(self.lookup(name)?.evaluate_with_dependencies(bindings)?)
    }

    fn lookup(&self, name: &str) -> CatalogResult<&Arc<SecondaryValue>> {
        self.get(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}

/// Depth-first construction with cycle detection
struct Resolver<'a> {
    document: &'a CatalogDocument,
    built: BTreeMap<String, Arc<SecondaryValue>>,
    /// Quantities currently being built
    building: HashSet<String>,
    /// Path of quantities for error reporting
    path: Vec<String>,
}

impl<'a> Resolver<'a> {
    fn new(document: &'a CatalogDocument) -> Self {
        Self {
            document,
            built: BTreeMap::new(),
            building: HashSet::new(),
            path: Vec::new(),
        }
    }

    fn resolve(&mut self, name: &str) -> CatalogResult<Arc<SecondaryValue>> {
        if let Some(built) = self.built.get(name) {
            return Ok(built.clone());
        }
        if self.building.contains(name) {
            let start = self.path.iter().position(|n| n == name).unwrap_or(0);
            let mut cycle = self.path[start..].to_vec();
            cycle.push(name.to_string());
            return Err(CatalogError::CircularDependency(cycle));
        }

        let definition = match self.document.quantities.get(name) {
            Some(definition) => definition,
            None => {
                return Err(CatalogError::UnknownQuantity {
                    name: name.to_string(),
                    referenced_by: self.path.last().cloned().unwrap_or_default(),
                })
            }
        };

        self.building.insert(name.to_string());
        self.path.push(name.to_string());

        let mut dependencies = BTreeMap::new();
        for (symbol, quantity) in &definition.dependencies {
            dependencies.insert(symbol.clone(), self.resolve(quantity)?);
        }

        self.building.remove(name);
        self.path.pop();

        let value = SecondaryValue::create(
            definition.formula.as_str(),
            definition.defaults.clone(),
            dependencies,
        )
        .map_err(|source| CatalogError::Formula {
            quantity: name.to_string(),
            source,
        })?;

        let value = Arc::new(value);
        self.built.insert(name.to_string(), value.clone());
        Ok(value)
    }
}
