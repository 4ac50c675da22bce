//! Adjacency structure over discovered state transitions.

use std::collections::BTreeMap;

use tracing::warn;

use crate::core::types::Transition;

/// Outgoing edge of the transition graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    pub to: String,
    pub event: String,
    pub platforms: Vec<String>,
}

/// Adjacency map `status -> outgoing transitions`, built once per run.
#[derive(Debug, Clone, Default)]
pub struct TransitionGraph {
    adjacency: BTreeMap<String, Vec<Edge>>,
}

impl TransitionGraph {
    /// Build the graph in O(E). Malformed transitions (empty endpoints) are
    /// skipped with a warning rather than failing the whole input.
    pub fn build(transitions: &[Transition]) -> Self {
        let mut adjacency: BTreeMap<String, Vec<Edge>> = BTreeMap::new();
        for transition in transitions {
            if transition.from.trim().is_empty() || transition.to.trim().is_empty() {
                warn!(event = %transition.event, "skipping malformed transition");
                continue;
            }
            adjacency
                .entry(transition.from.clone())
                .or_default()
                .push(Edge {
                    to: transition.to.clone(),
                    event: transition.event.clone(),
                    platforms: transition.platforms.clone(),
                });
        }
        Self { adjacency }
    }

    pub fn edges_from(&self, status: &str) -> &[Edge] {
        self.adjacency.get(status).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First edge connecting `from` directly to `to`, if any.
    pub fn direct(&self, from: &str, to: &str) -> Option<&Edge> {
        self.edges_from(from).iter().find(|edge| edge.to == to)
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }
}
