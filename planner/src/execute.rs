//! Auto-execution: run prerequisite actions until the target is ready.
//!
//! The loop alternates analysis and execution. Each iteration re-reads the
//! snapshot from disk, rebuilds the chain, and either stops (ready, blocked,
//! or missing fields) or executes the next incomplete step. A step whose
//! execution leaves the next step unchanged means the run is stalled and the
//! loop aborts instead of spinning.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Result;
use serde_json::Map;
use tracing::{debug, info, instrument, warn};

use crate::analyze::{PlannerEnv, analyze_target};
use crate::core::platform::cross_platform_steps;
use crate::core::types::{ChainStep, FieldGap, PathCandidate, ReadinessAnalysis};
use crate::io::actions::{ActionContext, ActionOutcome, ActionRegistry};
use crate::io::snapshot::{ChangeEntry, Snapshot, unix_timestamp};
use crate::report::{ManualCommand, render_report};

/// Raised when executing a step did not advance the chain.
#[derive(Debug)]
pub struct StalledError {
    pub status: String,
}

impl fmt::Display for StalledError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "execution stalled: step '{}' ran but the chain did not advance",
            self.status
        )
    }
}

impl std::error::Error for StalledError {}

/// Raised when a step names an action nobody registered.
#[derive(Debug)]
pub struct ActionLookupError {
    pub action: String,
    pub status: String,
}

impl fmt::Display for ActionLookupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "no action '{}' registered for step '{}'",
            self.action, self.status
        )
    }
}

impl std::error::Error for ActionLookupError {}

/// Why the run stopped without an error.
#[derive(Debug)]
pub enum RunStop {
    /// All prerequisites complete and no field gaps remain.
    Ready,
    /// Incomplete prerequisites belong to another platform family.
    Blocked { manual: Vec<ManualCommand> },
    /// Prerequisites are complete but required fields are missing.
    MissingFields { gaps: Vec<FieldGap> },
}

/// Result of one run towards a target.
#[derive(Debug)]
pub struct RunOutcome {
    pub target_status: String,
    pub steps_executed: usize,
    pub stop: RunStop,
    pub analysis: ReadinessAnalysis,
}

/// Execution settings for one run.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
    pub workdir: PathBuf,
    /// Directory for per-step action logs; no logs when absent.
    pub log_dir: Option<PathBuf>,
    pub action_timeout: Duration,
    pub output_limit_bytes: usize,
}

/// Drive the snapshot towards `target`, executing one prerequisite per
/// iteration until ready, blocked, or stalled.
#[instrument(skip_all, fields(target, data = %data_path.display()))]
pub fn run_to_target(
    env: &PlannerEnv,
    actions: &ActionRegistry,
    data_path: &Path,
    target: &str,
    route: Option<&PathCandidate>,
    exec: &ExecuteConfig,
) -> Result<RunOutcome> {
    let mut steps_executed = 0usize;
    loop {
        let snapshot = Snapshot::load(data_path)?;
        let analysis = analyze_target(env, &snapshot, target, route)?;

        if analysis.ready {
            info!(target, steps_executed, "target is ready");
            return Ok(RunOutcome {
                target_status: target.to_string(),
                steps_executed,
                stop: RunStop::Ready,
                analysis,
            });
        }

        let foreign = cross_platform_steps(&analysis.chain, &env.config.platform);
        if !foreign.is_empty() {
            let manual: Vec<ManualCommand> = foreign
                .iter()
                .map(|step| ManualCommand {
                    platform: step.platform.clone(),
                    status: step.status.clone(),
                    command: render_action_command(env, step, data_path),
                })
                .collect();
            warn!(
                target,
                steps = manual.len(),
                "blocked on prerequisites from another platform family"
            );
            return Ok(RunOutcome {
                target_status: target.to_string(),
                steps_executed,
                stop: RunStop::Blocked { manual },
                analysis,
            });
        }

        let Some(next_step) = analysis.next_step.clone() else {
            // Chain complete but field requirements unmet; no action fills
            // arbitrary fields, so report and stop.
            warn!(target, gaps = analysis.missing_fields.len(), "missing required fields");
            let gaps = analysis.missing_fields.clone();
            return Ok(RunOutcome {
                target_status: target.to_string(),
                steps_executed,
                stop: RunStop::MissingFields { gaps },
                analysis,
            });
        };

        // One extra iteration for the final readiness check.
        if steps_executed > analysis.chain.len() {
            let report = render_report(&analysis, &[], None)?;
            return Err(anyhow::Error::new(StalledError {
                status: next_step.status.clone(),
            })
            .context(report));
        }

        if let Err(err) = execute_step(env, actions, data_path, &next_step, steps_executed, exec) {
            // Attach the analysis so the failure is diagnosable on its own.
            let report = render_report(&analysis, &[], None)?;
            return Err(err
                .context(report)
                .context(format!("execute step '{}'", next_step.status)));
        }
        steps_executed += 1;

        // Re-analyze from disk; an unchanged next step means the action ran
        // without advancing the chain.
        let snapshot = Snapshot::load(data_path)?;
        let after = analyze_target(env, &snapshot, target, route)?;
        if after
            .next_step
            .as_ref()
            .is_some_and(|step| step.status == next_step.status)
        {
            let report = render_report(&after, &[], None)?;
            return Err(anyhow::Error::new(StalledError {
                status: next_step.status,
            })
            .context(report));
        }
    }
}

/// Resolve and run the action for one step, persisting its outcome.
fn execute_step(
    env: &PlannerEnv,
    actions: &ActionRegistry,
    data_path: &Path,
    step: &ChainStep,
    step_index: usize,
    exec: &ExecuteConfig,
) -> Result<()> {
    let action = actions.resolve(&step.action).ok_or_else(|| {
        anyhow::Error::new(ActionLookupError {
            action: step.action.clone(),
            status: step.status.clone(),
        })
    })?;

    let log_path = exec
        .log_dir
        .as_ref()
        .map(|dir| dir.join(format!("step-{}-{}.log", step_index, step.status)));
    let ctx = ActionContext {
        data_path: data_path.to_path_buf(),
        workdir: exec.workdir.clone(),
        timeout: exec.action_timeout,
        output_limit_bytes: exec.output_limit_bytes,
        log_path,
    };

    info!(status = %step.status, action = %step.action, "executing prerequisite");
    let outcome = action.run(&ctx)?;
    match outcome {
        ActionOutcome::Saved(path) => {
            debug!(path = %path.display(), "action persisted the snapshot itself");
        }
        ActionOutcome::PartialState(delta) => {
            persist_entry(data_path, step, delta)?;
        }
        ActionOutcome::NoOp => {
            // Record the attempt even without a delta so the log stays
            // complete.
            persist_entry(data_path, step, Map::new())?;
        }
    }
    Ok(())
}

fn persist_entry(
    data_path: &Path,
    step: &ChainStep,
    delta: Map<String, serde_json::Value>,
) -> Result<()> {
    let mut snapshot = Snapshot::load(data_path)?;
    snapshot.append(ChangeEntry {
        label: step.status.clone(),
        test_file: step.test_file.clone(),
        delta,
        timestamp: unix_timestamp(),
    });
    snapshot.save(data_path)?;
    Ok(())
}

/// Render the configured action command for a step, for display. Substitutes
/// the same placeholders actual execution does.
pub fn render_action_command(env: &PlannerEnv, step: &ChainStep, data_path: &Path) -> String {
    env.config
        .action
        .command
        .iter()
        .map(|part| {
            part.replace("{testFile}", &step.test_file)
                .replace("{data}", &data_path.to_string_lossy())
        })
        .collect::<Vec<String>>()
        .join(" ")
}
