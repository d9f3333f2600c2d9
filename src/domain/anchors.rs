//! Anchor table
//!
//! Flat, document-scoped mapping from anchor name to its resolved value.
//! Bindings are write-once and iterate in definition order.

use std::collections::HashMap;

use super::error::ResolveError;
use super::value::Value;

/// Named values declared once in a recipe and referenced elsewhere
#[derive(Debug, Clone, Default)]
pub struct AnchorTable {
    bindings: HashMap<String, Value>,

    /// Names in definition order
    order: Vec<String>,
}

impl AnchorTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `value`
    pub fn define(&mut self, name: impl Into<String>, value: Value) -> Result<(), ResolveError> {
        let name = name.into();
        if self.bindings.contains_key(&name) {
            return Err(ResolveError::DuplicateAnchor(name));
        }

        self.order.push(name.clone());
        self.bindings.insert(name, value);
        Ok(())
    }

    /// Returns the value bound to `name`
    pub fn resolve(&self, name: &str) -> Result<&Value, ResolveError> {
        self.bindings
            .get(name)
            .ok_or_else(|| ResolveError::UnknownAnchor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterates over bindings in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.order
            .iter()
            .filter_map(|name| self.bindings.get(name).map(|value| (name.as_str(), value)))
    }
}
