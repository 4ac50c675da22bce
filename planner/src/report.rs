//! Human-readable readiness reports rendered from a template.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::core::types::{ChainStep, ReadinessAnalysis};

const REPORT_TEMPLATE: &str = include_str!("templates/report.md");

/// A prerequisite the operator must run on another platform family.
#[derive(Debug, Clone, Serialize)]
pub struct ManualCommand {
    pub platform: String,
    pub status: String,
    pub command: String,
}

/// Chain step flattened for the template.
#[derive(Debug, Clone, Serialize)]
struct StepRow {
    label: &'static str,
    status: String,
    platform: String,
    entity: Option<String>,
    transition_event: Option<String>,
}

impl StepRow {
    fn from_step(step: &ChainStep) -> Self {
        let label = if step.is_target {
            "target"
        } else if step.is_current {
            "current"
        } else if step.complete {
            "done"
        } else {
            "pending"
        };
        Self {
            label,
            status: step.status.clone(),
            platform: step.platform.clone(),
            entity: step.entity.clone(),
            transition_event: step.transition_event.clone(),
        }
    }
}

/// Field gap flattened for the template.
#[derive(Debug, Clone, Serialize)]
struct GapRow {
    field: String,
    required: String,
    actual: String,
}

/// Render the readiness report for an analysis.
pub fn render_report(
    analysis: &ReadinessAnalysis,
    manual_commands: &[ManualCommand],
    next_command: Option<&str>,
) -> Result<String> {
    let mut env = Environment::new();
    env.add_template("report", REPORT_TEMPLATE)
        .context("compile report template")?;
    let template = env.get_template("report").context("load report template")?;

    let steps: Vec<StepRow> = analysis.chain.iter().map(StepRow::from_step).collect();
    let gaps: Vec<GapRow> = analysis
        .missing_fields
        .iter()
        .map(|gap| GapRow {
            field: gap.field.clone(),
            required: gap.required.clone(),
            actual: gap.actual.to_string(),
        })
        .collect();

    let rendered = template
        .render(context! {
            target_status => analysis.target_status,
            current_status => analysis.current_status,
            ready => analysis.ready,
            steps_remaining => analysis.steps_remaining,
            steps => steps,
            gaps => gaps,
            manual_commands => manual_commands,
            next_command => next_command,
        })
        .context("render report template")?;
    Ok(rendered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    fn analysis() -> ReadinessAnalysis {
        let mut current = step("draft", "web");
        current.is_current = true;
        current.complete = true;
        let pending = step("submitted", "web");
        let mut target = step("accepted", "web");
        target.is_target = true;
        ReadinessAnalysis {
            ready: false,
            current_status: "draft".to_string(),
            target_status: "accepted".to_string(),
            missing_fields: vec![crate::core::types::FieldGap {
                field: "applicantId".to_string(),
                required: "defined".to_string(),
                actual: serde_json::Value::Null,
            }],
            chain: vec![current, pending, target],
            next_step: Some(step("submitted", "web")),
            steps_remaining: 2,
        }
    }

    #[test]
    fn report_lists_chain_with_labels() {
        let report = render_report(&analysis(), &[], None).expect("render");
        assert!(report.contains("# Readiness report: accepted"));
        assert!(report.contains("[current] `draft`"));
        assert!(report.contains("[pending] `submitted`"));
        assert!(report.contains("[target] `accepted`"));
        assert!(report.contains("Ready: no"));
        assert!(report.contains("`applicantId`: requires defined, found null"));
    }

    #[test]
    fn report_includes_manual_commands_and_next_step() {
        let manual = vec![ManualCommand {
            platform: "ios".to_string(),
            status: "verified".to_string(),
            command: "npx playwright test tests/verify.test.js".to_string(),
        }];
        let report =
            render_report(&analysis(), &manual, Some("npx playwright test tests/submit.test.js"))
                .expect("render");
        assert!(report.contains("## Manual steps required"));
        assert!(report.contains("`verified` on ios"));
        assert!(report.contains("## Next step"));
        assert!(report.contains("tests/submit.test.js"));
    }

    #[test]
    fn report_omits_empty_sections() {
        let mut ready = analysis();
        ready.ready = true;
        ready.missing_fields.clear();
        let report = render_report(&ready, &[], None).expect("render");
        assert!(report.contains("Ready: yes"));
        assert!(!report.contains("## Missing fields"));
        assert!(!report.contains("## Manual steps required"));
        assert!(!report.contains("## Next step"));
    }
}
