//! Per-module method storage.

use rustc_hash::FxHashMap;

use crate::method::Method;
use crate::resolve;

/// Name to implementation mapping owned by a single module.
///
/// Definition order is recorded for introspection only; resolution never
/// looks at it. Every mutation advances the resolution generation so no
/// cached lookup outlives it.
#[derive(Debug, Default)]
pub struct MethodTable {
    entries: FxHashMap<String, Method>,
    order: Vec<String>,
}

impl MethodTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Store or overwrite `name`. An overwrite keeps the original position.
    pub fn define(&mut self, name: &str, method: Method) {
        if self.entries.insert(name.to_string(), method).is_none() {
            self.order.push(name.to_string());
        }
        resolve::invalidate();
    }

    /// Implementation stored under `name`
    pub fn lookup(&self, name: &str) -> Option<Method> {
        self.entries.get(name).cloned()
    }

    /// Remove `name`, returning the implementation it held
    pub fn remove(&mut self, name: &str) -> Option<Method> {
        let removed = self.entries.remove(name)?;
        self.order.retain(|n| n != name);
        resolve::invalidate();
        Some(removed)
    }

    /// Check whether `name` is defined here
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Names in definition order
    pub fn names(&self) -> &[String] {
        &self.order
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
