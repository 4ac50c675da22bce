//! Transition discovery input: the machine-extracted list of status
//! transitions the planner builds its graph from.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::core::types::Transition;

const DISCOVERY_SCHEMA: &str = include_str!("../../schemas/discovery.schema.json");

#[derive(Debug, Deserialize)]
struct DiscoveryFile {
    transitions: Vec<Transition>,
}

/// Load and schema-validate a discovery file.
pub fn load_transitions(path: &Path) -> Result<Vec<Transition>> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read discovery {}", path.display()))?;
    let instance: Value = serde_json::from_str(&contents)
        .with_context(|| format!("parse discovery {}", path.display()))?;
    validate_schema(DISCOVERY_SCHEMA, &instance)
        .with_context(|| format!("invalid discovery {}", path.display()))?;
    let file: DiscoveryFile = serde_json::from_value(instance)
        .with_context(|| format!("decode discovery {}", path.display()))?;
    debug!(path = %path.display(), transitions = file.transitions.len(), "discovery loaded");
    Ok(file.transitions)
}

/// Validate `instance` against an embedded JSON schema, reporting every
/// violation rather than just the first.
pub(crate) fn validate_schema(schema_raw: &str, instance: &Value) -> Result<()> {
    let schema: Value = serde_json::from_str(schema_raw).context("parse embedded schema")?;
    let validator = jsonschema::validator_for(&schema).context("compile embedded schema")?;
    let errors: Vec<String> = validator
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(anyhow!(
            "schema validation failed:\n- {}",
            errors.join("\n- ")
        ))
    }
}
