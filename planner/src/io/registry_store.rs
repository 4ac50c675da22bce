//! Implication registry input: the per-status specifications that tie each
//! reachable status to an executable action.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::core::registry::Registry;
use crate::core::types::ImplicationSpec;
use crate::io::discovery::validate_schema;

const REGISTRY_SCHEMA: &str = include_str!("../../schemas/registry.schema.json");

/// Load and schema-validate a registry file keyed by status name.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read registry {}", path.display()))?;
    let instance: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse registry {}", path.display()))?;
    validate_schema(REGISTRY_SCHEMA, &instance)
        .with_context(|| format!("invalid registry {}", path.display()))?;
    let raw: BTreeMap<String, ImplicationSpec> = serde_json::from_value(instance)
        .with_context(|| format!("decode registry {}", path.display()))?;

    // The status lives in the map key, not the entry body.
    let specs = raw.into_iter().map(|(status, mut spec)| {
        spec.status = status;
        spec
    });
    let registry = Registry::new(specs);
    debug!(path = %path.display(), statuses = registry.len(), "registry loaded");
    Ok(registry)
}
