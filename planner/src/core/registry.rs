//! Status registry: which implication produces each status.
//!
//! Loaded once per run from the registry file and treated as immutable.

use std::collections::BTreeMap;

use crate::core::types::ImplicationSpec;

/// Static mapping from status name to its implication entry.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    by_status: BTreeMap<String, ImplicationSpec>,
}

impl Registry {
    pub fn new(entries: impl IntoIterator<Item = ImplicationSpec>) -> Self {
        let by_status = entries
            .into_iter()
            .map(|entry| (entry.status.clone(), entry))
            .collect();
        Self { by_status }
    }

    pub fn get(&self, status: &str) -> Option<&ImplicationSpec> {
        self.by_status.get(status)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ImplicationSpec> {
        self.by_status.values()
    }

    pub fn statuses(&self) -> impl Iterator<Item = &str> {
        self.by_status.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_status.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_status.is_empty()
    }
}
