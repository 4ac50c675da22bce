//! Executable prerequisite actions and the registry that resolves them.
//!
//! Actions report how they affected persisted state through [`ActionOutcome`]
//! so the executor knows whether it must persist a change-log entry itself or
//! whether the action already wrote the snapshot.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::io::process::run_command_with_timeout;

/// Everything an action needs to run one step.
#[derive(Debug, Clone)]
pub struct ActionContext {
    /// Snapshot path of the run; actions that persist state write its
    /// `-current.json` sibling.
    pub data_path: PathBuf,
    /// Working directory for spawned commands.
    pub workdir: PathBuf,
    pub timeout: Duration,
    pub output_limit_bytes: usize,
    /// Where the action writes its captured output, if it runs a command.
    pub log_path: Option<PathBuf>,
}

/// What an action did to persisted state.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// The action ran but changed no snapshot fields. The executor still
    /// records an empty change-log entry so the attempt is auditable.
    NoOp,
    /// The action loaded, modified, and saved the snapshot itself.
    Saved(PathBuf),
    /// The action produced a field delta for the executor to append and save.
    PartialState(Map<String, Value>),
}

/// One executable prerequisite.
pub trait PrerequisiteAction {
    fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome>;
}

/// Wrap a closure as an action.
pub struct FnAction<F>(pub F);

impl<F> PrerequisiteAction for FnAction<F>
where
    F: Fn(&ActionContext) -> Result<ActionOutcome>,
{
    fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome> {
        (self.0)(ctx)
    }
}

/// Registered actions, looked up by the identifier each implication names.
#[derive(Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Box<dyn PrerequisiteAction>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action; a duplicate name replaces the previous entry.
    pub fn register(&mut self, name: &str, action: Box<dyn PrerequisiteAction>) {
        if self.actions.insert(name.to_string(), action).is_some() {
            warn!(action = name, "action registered twice, keeping the latest");
        }
    }

    /// Look up by exact name first, then by the camelCase form of a
    /// snake_case identifier.
    pub fn resolve(&self, name: &str) -> Option<&dyn PrerequisiteAction> {
        if let Some(action) = self.actions.get(name) {
            return Some(action.as_ref());
        }
        let fallback = camel_case(name);
        if fallback != name
            && let Some(action) = self.actions.get(&fallback)
        {
            debug!(action = name, resolved = %fallback, "resolved action via camelCase fallback");
            return Some(action.as_ref());
        }
        None
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.actions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}

/// `open_loan_account` -> `openLoanAccount`.
fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;
    for ch in name.chars() {
        if ch == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    out
}

/// An action that drives a test file through the configured command template.
pub struct CommandAction {
    command: Vec<String>,
    test_file: String,
}

impl CommandAction {
    pub fn new(command: Vec<String>, test_file: &str) -> Self {
        Self {
            command,
            test_file: test_file.to_string(),
        }
    }

    fn rendered(&self, ctx: &ActionContext) -> Vec<String> {
        self.command
            .iter()
            .map(|part| {
                part.replace("{testFile}", &self.test_file)
                    .replace("{data}", &ctx.data_path.to_string_lossy())
            })
            .collect()
    }
}

impl PrerequisiteAction for CommandAction {
    fn run(&self, ctx: &ActionContext) -> Result<ActionOutcome> {
        let argv = self.rendered(ctx);
        let program = argv
            .first()
            .ok_or_else(|| anyhow!("action command template is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(&argv[1..]).current_dir(&ctx.workdir);

        debug!(command = %argv.join(" "), "running action command");
        let output = run_command_with_timeout(cmd, ctx.timeout, ctx.output_limit_bytes)?;

        if let Some(log_path) = &ctx.log_path {
            write_action_log(log_path, &argv, &output)?;
        }

        if output.timed_out {
            return Err(anyhow!(
                "action command timed out after {}s: {}",
                ctx.timeout.as_secs(),
                argv.join(" ")
            ));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "action command failed with {}: {}\n{}{}",
                output.status,
                argv.join(" "),
                String::from_utf8_lossy(&output.stderr),
                output.stderr_truncated_notice("action"),
            ));
        }

        // The spawned test is expected to persist its own state transitions.
        Ok(ActionOutcome::Saved(ctx.data_path.clone()))
    }
}

fn write_action_log(
    log_path: &std::path::Path,
    argv: &[String],
    output: &crate::io::process::CommandOutput,
) -> Result<()> {
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let mut contents = format!("$ {}\n", argv.join(" "));
    contents.push_str(&String::from_utf8_lossy(&output.stdout));
    contents.push_str(&output.stdout_truncated_notice("action"));
    contents.push_str(&String::from_utf8_lossy(&output.stderr));
    contents.push_str(&output.stderr_truncated_notice("action"));
    fs::write(log_path, contents)
        .with_context(|| format!("write action log {}", log_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(workdir: &std::path::Path) -> ActionContext {
        ActionContext {
            data_path: workdir.join("run.json"),
            workdir: workdir.to_path_buf(),
            timeout: Duration::from_secs(5),
            output_limit_bytes: 4096,
            log_path: None,
        }
    }

    #[test]
    fn camel_case_converts_snake_case() {
        assert_eq!(camel_case("open_loan_account"), "openLoanAccount");
        assert_eq!(camel_case("submit"), "submit");
        assert_eq!(camel_case("alreadyCamel"), "alreadyCamel");
    }

    #[test]
    fn resolve_prefers_exact_then_camel_case() {
        let mut registry = ActionRegistry::new();
        registry.register(
            "openLoanAccount",
            Box::new(FnAction(|_: &ActionContext| Ok(ActionOutcome::NoOp))),
        );
        registry.register(
            "submit",
            Box::new(FnAction(|_: &ActionContext| Ok(ActionOutcome::NoOp))),
        );

        assert!(registry.resolve("submit").is_some());
        assert!(registry.resolve("open_loan_account").is_some());
        assert!(registry.resolve("close_loan_account").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn fn_action_returns_partial_state() {
        let temp = tempfile::tempdir().expect("tempdir");
        let action = FnAction(|_: &ActionContext| {
            let delta = json!({"status": "submitted"});
            Ok(ActionOutcome::PartialState(
                delta.as_object().expect("object").clone(),
            ))
        });

        let outcome = action.run(&ctx(temp.path())).expect("run");
        match outcome {
            ActionOutcome::PartialState(delta) => {
                assert_eq!(delta.get("status"), Some(&json!("submitted")));
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn command_action_substitutes_placeholders_and_logs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log_path = temp.path().join("logs/step.log");
        let mut context = ctx(temp.path());
        context.log_path = Some(log_path.clone());

        let action = CommandAction::new(
            vec!["echo".to_string(), "{testFile}".to_string()],
            "tests/submit.test.js",
        );
        let outcome = action.run(&context).expect("run");
        assert_eq!(outcome, ActionOutcome::Saved(context.data_path.clone()));

        let log = fs::read_to_string(&log_path).expect("log");
        assert!(log.contains("$ echo tests/submit.test.js"));
        assert!(log.contains("tests/submit.test.js\n"));
    }

    #[test]
    fn command_action_failure_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let action = CommandAction::new(
            vec!["sh".to_string(), "-c".to_string(), "echo boom >&2; exit 2".to_string()],
            "unused",
        );

        let err = action.run(&ctx(temp.path())).expect_err("failure");
        let message = format!("{err:#}");
        assert!(message.contains("failed"));
        assert!(message.contains("boom"));
    }
}
