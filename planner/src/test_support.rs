//! Test-only helpers for constructing transitions, implications, and steps.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Map;

use crate::core::types::{ChainStep, ImplicationSpec, Requires, Transition};

/// A temporary working area for filesystem tests.
pub struct TestArea {
    dir: tempfile::TempDir,
}

impl TestArea {
    pub fn new() -> Result<Self> {
        let dir = tempfile::tempdir().context("create temp dir")?;
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write pretty JSON with a trailing newline, creating parent dirs.
    pub fn write_json(&self, relative: &str, value: &serde_json::Value) -> Result<PathBuf> {
        let path = self.dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create directory {}", parent.display()))?;
        }
        let mut payload = serde_json::to_string_pretty(value).context("serialize json")?;
        payload.push('\n');
        std::fs::write(&path, payload).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }
}

/// Create a transition with optional platform tags.
pub fn transition(from: &str, to: &str, event: &str, platforms: &[&str]) -> Transition {
    Transition {
        from: from.to_string(),
        to: to.to_string(),
        event: event.to_string(),
        platforms: platforms.iter().map(ToString::to_string).collect(),
    }
}

/// Create a deterministic web implication with an optional predecessor.
pub fn spec(status: &str, previous: Option<&str>) -> ImplicationSpec {
    spec_on(status, previous, "web")
}

/// Create a deterministic implication on an explicit platform.
pub fn spec_on(status: &str, previous: Option<&str>, platform: &str) -> ImplicationSpec {
    ImplicationSpec {
        status: status.to_string(),
        implementation_id: format!("impl-{status}"),
        action: format!("reach_{status}"),
        test_file: format!("tests/{status}.test.js"),
        platform: platform.to_string(),
        entity: None,
        requires: previous.map(|previous_status| Requires {
            previous_status: previous_status.to_string(),
        }),
        requirements: Map::new(),
        required_fields: Vec::new(),
    }
}

/// Create an entity-scoped implication with an optional predecessor.
pub fn entity_spec(status: &str, previous: Option<&str>, entity: &str) -> ImplicationSpec {
    let mut spec = spec(status, previous);
    spec.entity = Some(entity.to_string());
    spec
}

/// Create an unmarked chain step on an explicit platform.
pub fn step(status: &str, platform: &str) -> ChainStep {
    ChainStep::from_spec(&spec_on(status, None, platform))
}
