//! Shared deterministic types for planner core logic.
//!
//! These types define stable contracts between core components and the
//! external JSON inputs. They must not depend on I/O and must remain
//! deterministic across runs. Wire field names are camelCase to match the
//! documents produced by the implication analysis layer.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Execution-platform family used by the cross-platform guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformClass {
    Mobile,
    Web,
}

/// A state transition discovered by static analysis of implication sources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub event: String,
    #[serde(default)]
    pub platforms: Vec<String>,
}

/// Predecessor declared by an implication (`requires.previousStatus`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Requires {
    pub previous_status: String,
}

/// Registry entry describing the implementation that can produce a status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplicationSpec {
    /// Status this implication produces. Filled from the registry map key.
    #[serde(default)]
    pub status: String,
    pub implementation_id: String,
    /// Identifier of the auto-executable action for this status.
    pub action: String,
    /// Test file the action drives against the system under test.
    pub test_file: String,
    #[serde(default = "default_platform")]
    pub platform: String,
    /// Entity name for entity-scoped implications (`data[entity].status` axis).
    #[serde(default)]
    pub entity: Option<String>,
    #[serde(default)]
    pub requires: Option<Requires>,
    /// Field requirements: exact match, `"!field"` for must-not-equal, and
    /// contains-semantics when the live value is an array.
    #[serde(default)]
    pub requirements: Map<String, Value>,
    /// Fields that must be present and non-null regardless of value.
    #[serde(default)]
    pub required_fields: Vec<String>,
}

fn default_platform() -> String {
    "web".to_string()
}

/// One step in a prerequisite chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainStep {
    pub status: String,
    pub implementation_id: String,
    pub action: String,
    pub test_file: String,
    pub platform: String,
    pub complete: bool,
    pub is_current: bool,
    pub is_target: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transition_from: Option<String>,
}

impl ChainStep {
    /// Build an unmarked step from a registry entry.
    pub fn from_spec(spec: &ImplicationSpec) -> Self {
        Self {
            status: spec.status.clone(),
            implementation_id: spec.implementation_id.clone(),
            action: spec.action.clone(),
            test_file: spec.test_file.clone(),
            platform: spec.platform.clone(),
            complete: false,
            is_current: false,
            is_target: false,
            entity: spec.entity.clone(),
            transition_event: None,
            transition_from: None,
        }
    }
}

/// A required-field mismatch between an implication and the live snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldGap {
    pub field: String,
    /// Human-readable requirement: a JSON value, `NOT <value>`, or `defined`.
    pub required: String,
    pub actual: Value,
}

/// Outcome of evaluating a chain against the current snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessAnalysis {
    /// True iff all non-target steps are complete and no field gaps remain.
    pub ready: bool,
    pub current_status: String,
    pub target_status: String,
    pub missing_fields: Vec<FieldGap>,
    pub chain: Vec<ChainStep>,
    /// First incomplete, non-target step, if any.
    pub next_step: Option<ChainStep>,
    /// Incomplete steps, the target's own trigger included.
    pub steps_remaining: usize,
}

/// A ranked candidate path from the current status to a target status.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PathCandidate {
    pub steps: Vec<ChainStep>,
    pub current_platform: String,
    pub has_cross_platform: bool,
    pub score: i64,
}
