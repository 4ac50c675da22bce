//! Recursive prerequisite chain construction.
//!
//! A chain is the ordered list of statuses that must be reached before the
//! target's own trigger can run. It is derived from each implication's
//! declared `requires.previousStatus`, with a direct-transition shortcut for
//! the original target, or from a route the caller selected among ranked
//! path candidates.

use std::collections::BTreeSet;
use std::fmt;

use tracing::warn;

use crate::core::graph::TransitionGraph;
use crate::core::registry::Registry;
use crate::core::types::ChainStep;

/// Raised when a status in the chain has no registered implication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatusError {
    pub status: String,
}

impl fmt::Display for UnknownStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "no implication registered for status '{}'", self.status)
    }
}

impl std::error::Error for UnknownStatusError {}

/// Registry-driven chain builder over the transition graph.
pub struct ChainBuilder<'a> {
    registry: &'a Registry,
    graph: &'a TransitionGraph,
}

impl<'a> ChainBuilder<'a> {
    pub fn new(registry: &'a Registry, graph: &'a TransitionGraph) -> Self {
        Self { registry, graph }
    }

    /// Build the chain from `current_status` to `target_status` and mark
    /// completion under both status axes.
    ///
    /// `global_status` is only passed for entity-scoped targets, where the
    /// global `data.status` advances independently of the entity-local chain.
    /// `route` is an optional caller-selected path; it is used verbatim when
    /// it reaches the target, otherwise declared prerequisites win.
    pub fn build(
        &self,
        current_status: &str,
        target_status: &str,
        global_status: Option<&str>,
        route: Option<&[ChainStep]>,
    ) -> Result<Vec<ChainStep>, UnknownStatusError> {
        if let Some(route) = route {
            if route.last().is_some_and(|step| step.status == target_status) {
                let mut chain = self.refresh_route(route);
                mark_chain(&mut chain, current_status, global_status);
                return Ok(chain);
            }
            warn!(
                target = target_status,
                "selected route does not reach the target, using declared prerequisites"
            );
        }

        let mut visited = BTreeSet::new();
        let mut chain = self.resolve(current_status, target_status, &mut visited, true)?;
        mark_chain(&mut chain, current_status, global_status);
        Ok(chain)
    }

    fn resolve(
        &self,
        current_status: &str,
        target_status: &str,
        visited: &mut BTreeSet<String>,
        is_original_target: bool,
    ) -> Result<Vec<ChainStep>, UnknownStatusError> {
        if !visited.insert(target_status.to_string()) {
            warn!(
                status = target_status,
                "cycle in prerequisite chain, dropping branch"
            );
            return Ok(Vec::new());
        }

        let spec = self
            .registry
            .get(target_status)
            .ok_or_else(|| UnknownStatusError {
                status: target_status.to_string(),
            })?;

        // A direct transition to the original target makes walking its
        // declared prerequisites unnecessary.
        if is_original_target
            && let Some(edge) = self.graph.direct(current_status, target_status)
        {
            let mut step = ChainStep::from_spec(spec);
            step.transition_event = Some(edge.event.clone());
            step.transition_from = Some(current_status.to_string());
            return Ok(vec![step]);
        }

        let mut chain = Vec::new();
        if let Some(requires) = &spec.requires {
            chain = self.resolve(current_status, &requires.previous_status, visited, false)?;
        }
        chain.push(ChainStep::from_spec(spec));
        Ok(chain)
    }

    /// Re-resolve route steps against the registry so requirements and action
    /// names are current, and clear any stale markers.
    fn refresh_route(&self, route: &[ChainStep]) -> Vec<ChainStep> {
        route
            .iter()
            .map(|step| {
                let mut refreshed = match self.registry.get(&step.status) {
                    Some(spec) => {
                        let mut s = ChainStep::from_spec(spec);
                        s.transition_event = step.transition_event.clone();
                        s.transition_from = step.transition_from.clone();
                        s
                    }
                    None => step.clone(),
                };
                refreshed.complete = false;
                refreshed.is_current = false;
                refreshed.is_target = false;
                refreshed
            })
            .collect()
    }
}

/// Mark completion, the current position, and the single target step.
///
/// Completion is a prefix: every step up to and including the one matching
/// `current_status` is complete. For entity-scoped chains, non-entity steps
/// at or before the global status are complete as well, because the entity
/// and global axes advance independently.
fn mark_chain(chain: &mut [ChainStep], current_status: &str, global_status: Option<&str>) {
    if let Some(idx) = chain
        .iter()
        .position(|step| step.status == current_status)
    {
        for step in &mut chain[..=idx] {
            step.complete = true;
        }
        chain[idx].is_current = true;
    }

    if let Some(global) = global_status {
        if chain
            .iter()
            .any(|step| step.entity.is_some() && step.status == global)
        {
            warn!(
                status = global,
                "entity-local status shares a name with the global status; completion marks may be unreliable"
            );
        }
        if let Some(gidx) = chain
            .iter()
            .position(|step| step.entity.is_none() && step.status == global)
        {
            for step in chain[..=gidx].iter_mut().filter(|step| step.entity.is_none()) {
                step.complete = true;
            }
        }
    }

    if let Some(last) = chain.last_mut() {
        last.is_target = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{entity_spec, spec, transition};

    fn graph(transitions: &[crate::core::types::Transition]) -> TransitionGraph {
        TransitionGraph::build(transitions)
    }

    #[test]
    fn builds_chain_from_declared_prerequisites() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("submitted", Some("draft")),
            spec("accepted", Some("submitted")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder.build("draft", "accepted", None, None).expect("chain");
        let statuses: Vec<&str> = chain.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["draft", "submitted", "accepted"]);
        assert!(chain[0].complete);
        assert!(chain[0].is_current);
        assert!(!chain[1].complete);
        assert!(chain[2].is_target);
    }

    /// A direct transition from the current status to the original target
    /// short-circuits prerequisite walking.
    #[test]
    fn direct_transition_short_circuits() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("submitted", Some("draft")),
            spec("accepted", Some("submitted")),
        ]);
        let graph = graph(&[transition("draft", "accepted", "fast_track", &["web"])]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder.build("draft", "accepted", None, None).expect("chain");
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].status, "accepted");
        assert_eq!(chain[0].transition_event.as_deref(), Some("fast_track"));
        assert_eq!(chain[0].transition_from.as_deref(), Some("draft"));
        assert!(chain[0].is_target);
    }

    /// Current status not present in the chain leaves every non-target step
    /// incomplete (nothing has been reached yet).
    #[test]
    fn unreached_chain_has_no_complete_steps() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("accepted", Some("draft")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder.build("initial", "accepted", None, None).expect("chain");
        assert!(chain.iter().all(|step| !step.complete));
        assert_eq!(chain[0].status, "draft");
    }

    #[test]
    fn cycle_drops_branch_instead_of_failing() {
        let registry = Registry::new(vec![
            spec("a", Some("b")),
            spec("b", Some("a")),
            spec("target", Some("a")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder.build("initial", "target", None, None).expect("chain");
        let statuses: Vec<&str> = chain.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["b", "a", "target"]);
    }

    #[test]
    fn unknown_status_is_an_error() {
        let registry = Registry::new(vec![spec("accepted", Some("ghost"))]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let err = builder
            .build("initial", "accepted", None, None)
            .expect_err("missing registry entry");
        assert_eq!(err.status, "ghost");
    }

    /// Completeness is a prefix: a complete step never follows an incomplete
    /// one on a single axis.
    #[test]
    fn completeness_is_monotonic() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("submitted", Some("draft")),
            spec("reviewed", Some("submitted")),
            spec("accepted", Some("reviewed")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        for current in ["draft", "submitted", "reviewed"] {
            let chain = builder.build(current, "accepted", None, None).expect("chain");
            let mut seen_incomplete = false;
            for step in &chain {
                if !step.complete {
                    seen_incomplete = true;
                }
                assert!(!(step.complete && seen_incomplete), "prefix broken at {}", step.status);
            }
        }
    }

    #[test]
    fn exactly_one_target_marker() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("submitted", Some("draft")),
            spec("accepted", Some("submitted")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder.build("draft", "accepted", None, None).expect("chain");
        assert_eq!(chain.iter().filter(|s| s.is_target).count(), 1);
    }

    /// Entity-scoped chains also honor the global status axis: non-entity
    /// steps at or before the global status are complete even when the
    /// entity-local status has not reached them.
    #[test]
    fn global_axis_marks_non_entity_steps_complete() {
        let registry = Registry::new(vec![
            spec("registered", None),
            entity_spec("loan_opened", Some("registered"), "loan"),
            entity_spec("loan_funded", Some("loan_opened"), "loan"),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let chain = builder
            .build("loan_opened", "loan_funded", Some("registered"), None)
            .expect("chain");
        let registered = chain.iter().find(|s| s.status == "registered").expect("step");
        assert!(registered.complete);
        let funded = chain.iter().find(|s| s.status == "loan_funded").expect("step");
        assert!(!funded.complete);
    }

    #[test]
    fn route_overrides_declared_prerequisites() {
        let registry = Registry::new(vec![
            spec("draft", None),
            spec("submitted", Some("draft")),
            spec("accepted", Some("submitted")),
        ]);
        let graph = graph(&[]);
        let builder = ChainBuilder::new(&registry, &graph);

        let route = vec![
            crate::test_support::step("draft", "web"),
            crate::test_support::step("accepted", "web"),
        ];
        let chain = builder
            .build("draft", "accepted", None, Some(&route))
            .expect("chain");
        let statuses: Vec<&str> = chain.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(statuses, vec!["draft", "accepted"]);
        assert!(chain[0].complete && chain[0].is_current);
        assert!(chain[1].is_target && !chain[1].complete);
    }
}
