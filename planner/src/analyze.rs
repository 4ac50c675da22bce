//! Orchestration: load inputs once, then answer readiness and path queries.

use std::path::Path;

use anyhow::{Context, Result, anyhow};
use tracing::{debug, instrument};

use crate::core::chain::ChainBuilder;
use crate::core::graph::TransitionGraph;
use crate::core::pathfind::{find_all_paths, rank_paths};
use crate::core::readiness;
use crate::core::registry::Registry;
use crate::core::types::{PathCandidate, ReadinessAnalysis};
use crate::io::config::PlannerConfig;
use crate::io::discovery::load_transitions;
use crate::io::registry_store::load_registry;
use crate::io::snapshot::Snapshot;

/// Loaded planner inputs shared by every command.
pub struct PlannerEnv {
    pub config: PlannerConfig,
    pub registry: Registry,
    pub graph: TransitionGraph,
}

impl PlannerEnv {
    /// Load discovery, registry, and config from disk.
    #[instrument(skip_all, fields(discovery = %discovery_path.display(), registry = %registry_path.display()))]
    pub fn load(discovery_path: &Path, registry_path: &Path, config_path: &Path) -> Result<Self> {
        let config = PlannerConfig::load(config_path).context("load planner config")?;
        let registry = load_registry(registry_path).context("load implication registry")?;
        if registry.is_empty() {
            return Err(anyhow!(
                "registry {} contains no implications",
                registry_path.display()
            ));
        }
        let transitions = load_transitions(discovery_path).context("load discovered transitions")?;
        let graph = TransitionGraph::build(&transitions);
        debug!(statuses = registry.len(), "planner inputs loaded");
        Ok(Self {
            config,
            registry,
            graph,
        })
    }
}

/// Current status for a target, honoring the entity axis.
///
/// An entity-scoped target reads `data[entity].status` first and falls back
/// to the global `data.status`. A snapshot with no status at all starts from
/// `initial`.
pub fn current_status_for(env: &PlannerEnv, snapshot: &Snapshot, target: &str) -> String {
    let entity = env
        .registry
        .get(target)
        .and_then(|spec| spec.entity.as_deref());
    let status = match entity {
        Some(entity) => snapshot.entity_status(entity).or_else(|| snapshot.status()),
        None => snapshot.status(),
    };
    status.unwrap_or("initial").to_string()
}

/// Build the prerequisite chain for `target` and evaluate readiness.
///
/// `route` carries an operator-selected path; the chain follows it when it
/// reaches the target.
#[instrument(skip_all, fields(target))]
pub fn analyze_target(
    env: &PlannerEnv,
    snapshot: &Snapshot,
    target: &str,
    route: Option<&PathCandidate>,
) -> Result<ReadinessAnalysis> {
    let spec = env
        .registry
        .get(target)
        .ok_or_else(|| anyhow!("no implication registered for status '{target}'"))?;
    let current_status = current_status_for(env, snapshot, target);

    // The global axis only matters for entity-scoped targets, where the two
    // statuses advance independently.
    let global_status = spec.entity.as_deref().and(snapshot.status());

    let builder = ChainBuilder::new(&env.registry, &env.graph);
    let chain = builder
        .build(
            &current_status,
            target,
            global_status,
            route.map(|candidate| candidate.steps.as_slice()),
        )
        .map_err(anyhow::Error::new)?;

    Ok(readiness::analyze(&chain, spec, snapshot.data(), &current_status))
}

/// Discover and rank every path from the snapshot's status to `target`.
pub fn candidate_paths(
    env: &PlannerEnv,
    snapshot: &Snapshot,
    target: &str,
) -> Result<Vec<PathCandidate>> {
    if env.registry.get(target).is_none() {
        return Err(anyhow!("no implication registered for status '{target}'"));
    }
    let current_status = current_status_for(env, snapshot, target);
    let paths = find_all_paths(&env.graph, &current_status, target, env.config.max_depth);
    Ok(rank_paths(
        paths,
        &current_status,
        &env.registry,
        &env.config.platform,
    ))
}
