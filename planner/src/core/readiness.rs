//! Chain and field readiness evaluation.
//!
//! Readiness is returned as data, never thrown: callers decide whether to
//! prompt, auto-run, or abort.

use serde_json::{Map, Value};

use crate::core::types::{ChainStep, FieldGap, ImplicationSpec, ReadinessAnalysis};

/// Evaluate a chain and the live data against the target's implication.
///
/// A chain whose only incomplete step is the target itself is ready: the
/// remaining action is the triggering one, which the test itself performs.
pub fn analyze(
    chain: &[ChainStep],
    spec: &ImplicationSpec,
    data: &Map<String, Value>,
    current_status: &str,
) -> ReadinessAnalysis {
    let missing_fields = field_gaps(spec, data);
    let incomplete: Vec<&ChainStep> = chain
        .iter()
        .filter(|step| !step.complete && !step.is_target)
        .collect();
    let ready = incomplete.is_empty() && missing_fields.is_empty();
    let next_step = incomplete.first().map(|step| (*step).clone());
    let steps_remaining = chain.iter().filter(|step| !step.complete).count();

    ReadinessAnalysis {
        ready,
        current_status: current_status.to_string(),
        target_status: spec.status.clone(),
        missing_fields,
        chain: chain.to_vec(),
        next_step,
        steps_remaining,
    }
}

/// Evaluate field requirements independent of the chain.
///
/// Supported forms: exact match, negation via a `!` key prefix, contains
/// against array-typed live values (block-list semantics), and bare presence
/// demands from `requiredFields`.
pub fn field_gaps(spec: &ImplicationSpec, data: &Map<String, Value>) -> Vec<FieldGap> {
    let mut gaps = Vec::new();

    for (key, required) in &spec.requirements {
        let (field, negated) = match key.strip_prefix('!') {
            Some(stripped) => (stripped, true),
            None => (key.as_str(), false),
        };
        let actual = data.get(field);
        let holds = match actual {
            Some(Value::Array(items)) => items.contains(required),
            Some(value) => value == required,
            None => false,
        };

        if negated {
            if holds {
                gaps.push(FieldGap {
                    field: field.to_string(),
                    required: format!("NOT {required}"),
                    actual: actual.cloned().unwrap_or(Value::Null),
                });
            }
        } else if !holds {
            gaps.push(FieldGap {
                field: field.to_string(),
                required: required.to_string(),
                actual: actual.cloned().unwrap_or(Value::Null),
            });
        }
    }

    for field in &spec.required_fields {
        let actual = data.get(field);
        if actual.is_none() || actual == Some(&Value::Null) {
            gaps.push(FieldGap {
                field: field.clone(),
                required: "defined".to_string(),
                actual: Value::Null,
            });
        }
    }

    gaps
}
