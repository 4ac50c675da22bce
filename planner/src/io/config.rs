//! Planner configuration, persisted as TOML.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Top-level planner configuration. Every field has a default, so a missing
/// file means defaults and a partial file fills in the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Platform the run executes on; scores paths and gates cross-platform
    /// prerequisites.
    pub platform: String,
    /// Maximum hops explored during path discovery.
    pub max_depth: usize,
    /// Seconds the interactive path prompt waits before taking the default.
    pub prompt_timeout_secs: u64,
    pub action: ActionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionConfig {
    /// Command template for test-backed actions. `{testFile}` and `{data}`
    /// placeholders are substituted per step.
    pub command: Vec<String>,
    pub timeout_secs: u64,
    pub output_limit_bytes: usize,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            platform: "web".to_string(),
            max_depth: 8,
            prompt_timeout_secs: 15,
            action: ActionConfig::default(),
        }
    }
}

impl Default for ActionConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "npx".to_string(),
                "playwright".to_string(),
                "test".to_string(),
                "{testFile}".to_string(),
            ],
            timeout_secs: 600,
            output_limit_bytes: 100_000,
        }
    }
}

impl PlannerConfig {
    /// Load from `path`; a missing file yields defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "config file missing, using defaults");
            return Ok(Self::default());
        }
        let contents =
            fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parse config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.platform.trim().is_empty() {
            bail!("config: platform must not be empty");
        }
        if self.max_depth == 0 {
            bail!("config: max_depth must be at least 1");
        }
        if self.action.command.is_empty() {
            bail!("config: action.command must not be empty");
        }
        if self.action.timeout_secs == 0 {
            bail!("config: action.timeout_secs must be at least 1");
        }
        Ok(())
    }

    /// Write as TOML via a temp file and rename.
    pub fn write(&self, path: &Path) -> Result<()> {
        self.validate()?;
        let parent = path
            .parent()
            .with_context(|| format!("config path missing parent {}", path.display()))?;
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
        let contents = toml::to_string_pretty(self).context("serialize config")?;
        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, contents)
            .with_context(|| format!("write temp config {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path)
            .with_context(|| format!("replace config {}", path.display()))?;
        Ok(())
    }

    pub fn prompt_timeout(&self) -> Duration {
        Duration::from_secs(self.prompt_timeout_secs)
    }

    pub fn action_timeout(&self) -> Duration {
        Duration::from_secs(self.action.timeout_secs)
    }
}
