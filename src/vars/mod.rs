//! Variable environments.
//!
//! This module provides:
//! - [`Variables`], the ordered name -> value mapping every environment uses
//! - [`VarPrecedence`], the layer ordering used when a merged table is built
//! - [`snapshot`], which turns an engine's merged table into a recordable
//!   snapshot

pub mod snapshot;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

pub use snapshot::{is_internal_key, SnapshotExtractor, VariableSnapshot};

/// Variable precedence levels (from lowest to highest).
///
/// A subset of Ansible's ordering, covering the sources a merged table is
/// built from in this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum VarPrecedence {
    /// Inventory vars shared by all hosts (lowest priority)
    InventoryGroupVars = 1,
    /// Inventory host vars
    InventoryHostVars = 2,
    /// Play vars
    PlayVars = 3,
    /// Block and role vars visible to the task
    BlockVars = 4,
    /// set_facts / registered vars
    SetFacts = 5,
    /// Extra vars (--extra-vars, -e) - highest priority
    ExtraVars = 6,
}

/// An ordered mapping from variable name to a JSON-compatible value.
///
/// Insertion order is preserved so that serializing the same environment
/// twice always produces the same bytes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables {
    data: IndexMap<String, serde_json::Value>,
}

impl Variables {
    /// Create new empty variables
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a variable
    pub fn set(&mut self, key: impl Into<String>, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    /// Get a variable
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    /// Check if variable exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Merge with another variables set (other takes precedence)
    pub fn merge(&mut self, other: &Variables) {
        for (k, v) in &other.data {
            self.data.insert(k.clone(), v.clone());
        }
    }

    /// Keep only the entries whose key satisfies `keep`, preserving order.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.data.retain(|k, _| keep(k));
    }

    /// Returns the nested mapping stored under `key`, if it is one.
    pub fn get_table(&self, key: &str) -> Option<Variables> {
        match self.data.get(key) {
            Some(serde_json::Value::Object(map)) => Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Iterate over variable names in insertion order
    pub fn keys(&self) -> indexmap::map::Keys<'_, String, serde_json::Value> {
        self.data.keys()
    }

    /// Convert into a JSON object value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.data
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Check if variables is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Get the number of variables
    pub fn len(&self) -> usize {
        self.data.len()
    }
}

impl FromIterator<(String, serde_json::Value)> for Variables {
    fn from_iter<I: IntoIterator<Item = (String, serde_json::Value)>>(iter: I) -> Self {
        Self {
            data: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Variables {
    type Item = (String, serde_json::Value);
    type IntoIter = indexmap::map::IntoIter<String, serde_json::Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.into_iter()
    }
}

impl From<IndexMap<String, serde_json::Value>> for Variables {
    fn from(data: IndexMap<String, serde_json::Value>) -> Self {
        Self { data }
    }
}

/// Builds a merged table from layered sources, lowest precedence first.
#[derive(Debug, Default)]
pub struct LayeredVars {
    layers: Vec<(VarPrecedence, Variables)>,
}

impl LayeredVars {
    /// Create an empty layer stack
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a layer. Layers may be added in any order.
    pub fn layer(mut self, precedence: VarPrecedence, vars: &Variables) -> Self {
        self.layers.push((precedence, vars.clone()));
        self
    }

    /// Flatten all layers; higher precedence wins, ties go to the later layer.
    pub fn flatten(mut self) -> Variables {
        self.layers.sort_by_key(|(precedence, _)| *precedence);
        let mut merged = Variables::new();
        for (_, vars) in &self.layers {
            merged.merge(vars);
        }
        merged
    }
}
