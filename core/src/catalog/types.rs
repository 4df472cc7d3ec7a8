//! Serialized form of a catalog document.

use crate::propagation::Bindings;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A JSON catalog: named quantities that may depend on each other.
///
/// ```json
/// {
///   "quantities": {
///     "area":   { "formula": "w*h", "defaults": { "h": [2.0, 0.1] } },
///     "volume": { "formula": "area*d", "dependencies": { "area": "area" } }
///   }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogDocument {
    #[serde(default)]
    pub quantities: BTreeMap<String, QuantityDefinition>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuantityDefinition {
    pub formula: String,
    #[serde(default, skip_serializing_if = "Bindings::is_empty")]
    pub defaults: Bindings,
    /// Formula symbol to the name of the quantity that computes it
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl QuantityDefinition {
    pub fn new(formula: impl Into<String>) -> Self {
        Self {
            formula: formula.into(),
            defaults: Bindings::new(),
            dependencies: BTreeMap::new(),
            description: None,
        }
    }
}
