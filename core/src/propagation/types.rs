//! Core data types for bindings and propagated results.

use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

/// A scalar or an array of numbers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Scalar(f64),
    Array(Vec<f64>),
}

impl Value {
    /// Length of the array, `None` for scalars
    pub fn array_len(&self) -> Option<usize> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values.len()),
        }
    }

    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(value) => Some(*value),
            Self::Array(_) => None,
        }
    }

    pub fn as_slice(&self) -> Option<&[f64]> {
        match self {
            Self::Scalar(_) => None,
            Self::Array(values) => Some(values),
        }
    }

    /// Whether every element is exactly zero (an empty array counts as zero)
    pub fn is_zero(&self) -> bool {
        match self {
            Self::Scalar(value) => *value == 0.0,
            Self::Array(values) => values.iter().all(|v| *v == 0.0),
        }
    }

    /// Broadcast to a column of `len` rows.
    ///
    /// Arrays must already have length `len`; the evaluator checks shapes first.
    pub(crate) fn to_column(&self, len: usize) -> DVector<f64> {
        match self {
            Self::Scalar(value) => DVector::from_element(len, *value),
            Self::Array(values) => DVector::from_column_slice(values),
        }
    }

    /// Unwrap single-row columns back to scalars
    pub(crate) fn from_column(column: DVector<f64>) -> Self {
        if column.len() == 1 {
            Self::Scalar(column[0])
        } else {
            Self::Array(column.as_slice().to_vec())
        }
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Scalar(value)
    }
}

impl From<Vec<f64>> for Value {
    fn from(values: Vec<f64>) -> Self {
        Self::Array(values)
    }
}

impl From<&[f64]> for Value {
    fn from(values: &[f64]) -> Self {
        Self::Array(values.to_vec())
    }
}

impl<const N: usize> From<[f64; N]> for Value {
    fn from(values: [f64; N]) -> Self {
        Self::Array(values.to_vec())
    }
}

impl From<DVector<f64>> for Value {
    fn from(values: DVector<f64>) -> Self {
        Self::Array(values.as_slice().to_vec())
    }
}

/// The value of one symbol in one call: a central value plus zero or more
/// independent error channels.
///
/// Channels are numbered from 1. A channel the binding does not carry
/// contributes no error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BindingRepr", into = "BindingRepr")]
pub struct Binding {
    value: Value,
    errors: Vec<Value>,
}

impl Binding {
    /// A bare value without errors
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            errors: Vec::new(),
        }
    }

    /// Append the next error channel
    pub fn with_error(mut self, error: impl Into<Value>) -> Self {
        self.errors.push(error.into());
        self
    }

    pub fn from_parts(value: Value, errors: Vec<Value>) -> Self {
        Self { value, errors }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn errors(&self) -> &[Value] {
        &self.errors
    }

    /// Error of a 1-based channel
    pub fn error(&self, channel: usize) -> Option<&Value> {
        channel.checked_sub(1).and_then(|i| self.errors.get(i))
    }

    pub fn channels(&self) -> usize {
        self.errors.len()
    }

    /// The value followed by every error
    pub(crate) fn entries(&self) -> impl Iterator<Item = &Value> {
        std::iter::once(&self.value).chain(self.errors.iter())
    }
}

impl From<f64> for Binding {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<Vec<f64>> for Binding {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

impl From<&[f64]> for Binding {
    fn from(values: &[f64]) -> Self {
        Self::new(values)
    }
}

impl From<Value> for Binding {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl<V: Into<Value>, E1: Into<Value>> From<(V, E1)> for Binding {
    fn from((value, e1): (V, E1)) -> Self {
        Self::new(value).with_error(e1)
    }
}

impl<V: Into<Value>, E1: Into<Value>, E2: Into<Value>> From<(V, E1, E2)> for Binding {
    fn from((value, e1, e2): (V, E1, E2)) -> Self {
        Self::new(value).with_error(e1).with_error(e2)
    }
}

impl<V: Into<Value>, E1: Into<Value>, E2: Into<Value>, E3: Into<Value>> From<(V, E1, E2, E3)>
    for Binding
{
    fn from((value, e1, e2, e3): (V, E1, E2, E3)) -> Self {
        Self::new(value).with_error(e1).with_error(e2).with_error(e3)
    }
}

impl From<&Estimate> for Binding {
    fn from(estimate: &Estimate) -> Self {
        Self::from_parts(estimate.value().clone(), estimate.errors().to_vec())
    }
}

/// Wire form of a binding: a bare number, or `[value, error_1, ...]`
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum BindingRepr {
    Bare(f64),
    Parts(Vec<Value>),
}

impl TryFrom<BindingRepr> for Binding {
    type Error = String;

    fn try_from(repr: BindingRepr) -> Result<Self, Self::Error> {
        match repr {
            BindingRepr::Bare(value) => Ok(Binding::new(value)),
            BindingRepr::Parts(mut parts) => {
                if parts.is_empty() {
                    return Err("a binding needs at least a value".to_string());
                }
                let value = parts.remove(0);
                Ok(Binding::from_parts(value, parts))
            }
        }
    }
}

impl From<Binding> for BindingRepr {
    fn from(binding: Binding) -> Self {
        match (binding.value, binding.errors.is_empty()) {
            (Value::Scalar(value), true) => BindingRepr::Bare(value),
            (value, _) => {
                let mut parts = Vec::with_capacity(binding.errors.len() + 1);
                parts.push(value);
                parts.extend(binding.errors);
                BindingRepr::Parts(parts)
            }
        }
    }
}

/// Named bindings for one call, or the defaults of a formula
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Bindings(BTreeMap<String, Binding>);

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Self {
        self.insert(name, binding);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, binding: impl Into<Binding>) -> Option<Binding> {
        self.0.insert(name.into(), binding.into())
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.0.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.0.iter().map(|(name, binding)| (name.as_str(), binding))
    }

    /// The subset of bindings whose names are in `names`
    pub(crate) fn restricted_to(&self, names: &BTreeSet<String>) -> Bindings {
        Bindings(
            self.0
                .iter()
                .filter(|(name, _)| names.contains(*name))
                .map(|(name, binding)| (name.clone(), binding.clone()))
                .collect(),
        )
    }
}

impl<K: Into<String>, B: Into<Binding>> FromIterator<(K, B)> for Bindings {
    fn from_iter<I: IntoIterator<Item = (K, B)>>(iter: I) -> Self {
        let mut bindings = Bindings::new();
        bindings.extend(iter);
        bindings
    }
}

impl<K: Into<String>, B: Into<Binding>> Extend<(K, B)> for Bindings {
    fn extend<I: IntoIterator<Item = (K, B)>>(&mut self, iter: I) {
        for (name, binding) in iter {
            self.insert(name, binding);
        }
    }
}

/// Outcome of one evaluation: `[value, error_1, ..., error_N]`.
///
/// Entries are scalars when the call had a broadcast length of 1 and arrays
/// of the broadcast length otherwise.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Estimate(Vec<Value>);

impl Estimate {
    pub(crate) fn new(value: Value, errors: Vec<Value>) -> Self {
        let mut entries = Vec::with_capacity(errors.len() + 1);
        entries.push(value);
        entries.extend(errors);
        Self(entries)
    }

    pub fn value(&self) -> &Value {
        &self.0[0]
    }

    pub fn errors(&self) -> &[Value] {
        &self.0[1..]
    }

    /// Error of a 1-based channel
    pub fn error(&self, channel: usize) -> Option<&Value> {
        if channel == 0 {
            return None;
        }
        self.0.get(channel)
    }

    pub fn channels(&self) -> usize {
        self.0.len() - 1
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<Value> {
        self.0
    }
}

impl Index<usize> for Estimate {
    type Output = Value;

    fn index(&self, index: usize) -> &Value {
        &self.0[index]
    }
}

/// The result of a dependency evaluated on behalf of its parent
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DependencyResult {
    pub estimate: Estimate,
    pub dependencies: DependencyResults,
}

/// Dependency symbol to the result computed for it
pub type DependencyResults = BTreeMap<String, DependencyResult>;

/// Free symbols of a formula; symbols bound to a dependency carry the
/// dependency's own tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SymbolTree(BTreeMap<String, SymbolTree>);

impl SymbolTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, subtree: SymbolTree) {
        self.0.insert(name.into(), subtree);
    }

    pub fn get(&self, name: &str) -> Option<&SymbolTree> {
        self.0.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SymbolTree)> {
        self.0.iter().map(|(name, tree)| (name.as_str(), tree))
    }
}

impl<K: Into<String>> FromIterator<(K, SymbolTree)> for SymbolTree {
    fn from_iter<I: IntoIterator<Item = (K, SymbolTree)>>(iter: I) -> Self {
        let mut tree = SymbolTree::new();
        for (name, subtree) in iter {
            tree.insert(name, subtree);
        }
        tree
    }
}
