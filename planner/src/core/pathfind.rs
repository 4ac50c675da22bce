//! Breadth-first path discovery and ranking over the transition graph.

use std::collections::{HashSet, VecDeque};

use crate::core::graph::{Edge, TransitionGraph};
use crate::core::platform::classify;
use crate::core::registry::Registry;
use crate::core::types::{ChainStep, PathCandidate};

/// Default depth bound for path discovery.
pub const DEFAULT_MAX_DEPTH: usize = 8;

/// All simple paths from `start` to `target`, bounded by `max_depth` hops.
///
/// The visited set is per path, not global, so independent branches are still
/// explored while no path revisits a status. An empty result means no path
/// exists and is a valid outcome, not an error.
pub fn find_all_paths(
    graph: &TransitionGraph,
    start: &str,
    target: &str,
    max_depth: usize,
) -> Vec<Vec<Edge>> {
    let mut found = Vec::new();
    let mut queue: VecDeque<(Vec<Edge>, HashSet<String>)> = VecDeque::new();
    queue.push_back((Vec::new(), HashSet::from([start.to_string()])));

    while let Some((path, visited)) = queue.pop_front() {
        let at = path.last().map(|edge| edge.to.as_str()).unwrap_or(start);
        if !path.is_empty() && at == target {
            found.push(path);
            continue;
        }
        if path.len() >= max_depth {
            continue;
        }
        for edge in graph.edges_from(at) {
            if visited.contains(&edge.to) {
                continue;
            }
            let mut next_path = path.clone();
            next_path.push(edge.clone());
            let mut next_visited = visited.clone();
            next_visited.insert(edge.to.clone());
            queue.push_back((next_path, next_visited));
        }
    }

    found
}

/// Materialize and score discovered paths, best candidate first.
///
/// Scoring rewards steps on the current platform and shorter paths, and
/// penalizes any cross-platform hop. The sort is stable, so ties keep BFS
/// discovery order.
pub fn rank_paths(
    paths: Vec<Vec<Edge>>,
    start: &str,
    registry: &Registry,
    current_platform: &str,
) -> Vec<PathCandidate> {
    let mut candidates: Vec<PathCandidate> = paths
        .into_iter()
        .map(|path| materialize(path, start, registry, current_platform))
        .collect();
    candidates.sort_by(|a, b| b.score.cmp(&a.score));
    candidates
}

fn materialize(
    edges: Vec<Edge>,
    start: &str,
    registry: &Registry,
    current_platform: &str,
) -> PathCandidate {
    let mut steps = Vec::with_capacity(edges.len() + 1);
    let mut first = step_for(start, registry, current_platform);
    first.is_current = true;
    first.complete = true;
    steps.push(first);

    let mut prev_status = start.to_string();
    for edge in &edges {
        let fallback = edge
            .platforms
            .first()
            .map(String::as_str)
            .unwrap_or(current_platform);
        let mut step = step_for(&edge.to, registry, fallback);
        step.transition_event = Some(edge.event.clone());
        step.transition_from = Some(prev_status.clone());
        prev_status = edge.to.clone();
        steps.push(step);
    }
    if steps.len() > 1
        && let Some(last) = steps.last_mut()
    {
        last.is_target = true;
    }

    let current_class = classify(current_platform);
    let hops = &steps[1..];
    let same_platform = hops
        .iter()
        .filter(|step| classify(&step.platform) == current_class)
        .count() as i64;
    let has_cross_platform = hops
        .iter()
        .any(|step| classify(&step.platform) != current_class);
    let length = steps.len() as i64;
    let score = 100 + 20 * same_platform + 5 * (10 - length) - 50 * i64::from(has_cross_platform);

    PathCandidate {
        steps,
        current_platform: current_platform.to_string(),
        has_cross_platform,
        score,
    }
}

/// Registry-backed step when the status is known, otherwise a bare step
/// carrying only the status and a fallback platform.
fn step_for(status: &str, registry: &Registry, fallback_platform: &str) -> ChainStep {
    match registry.get(status) {
        Some(spec) => ChainStep::from_spec(spec),
        None => ChainStep {
            status: status.to_string(),
            implementation_id: String::new(),
            action: String::new(),
            test_file: String::new(),
            platform: fallback_platform.to_string(),
            complete: false,
            is_current: false,
            is_target: false,
            entity: None,
            transition_event: None,
            transition_from: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{spec, spec_on, transition};

    fn graph() -> TransitionGraph {
        TransitionGraph::build(&[
            transition("a", "b", "a_to_b", &["web"]),
            transition("b", "d", "b_to_d", &["web"]),
            transition("a", "c", "a_to_c", &["web"]),
            transition("c", "e", "c_to_e", &["ios"]),
            transition("e", "d", "e_to_d", &["web"]),
        ])
    }

    #[test]
    fn finds_all_simple_paths() {
        let paths = find_all_paths(&graph(), "a", "d", DEFAULT_MAX_DEPTH);
        assert_eq!(paths.len(), 2);
    }

    #[test]
    fn no_path_is_a_valid_empty_result() {
        let paths = find_all_paths(&graph(), "d", "a", DEFAULT_MAX_DEPTH);
        assert!(paths.is_empty());
    }

    #[test]
    fn depth_bound_terminates_cyclic_graphs() {
        let cyclic = TransitionGraph::build(&[
            transition("a", "b", "forward", &[]),
            transition("b", "a", "back", &[]),
            transition("b", "c", "out", &[]),
        ]);
        let paths = find_all_paths(&cyclic, "a", "c", 3);
        assert_eq!(paths.len(), 1);
        assert_eq!(paths[0].len(), 2);
    }

    /// A shorter same-platform path must outrank a longer path with a
    /// cross-platform hop.
    #[test]
    fn same_platform_short_path_ranks_first() {
        let registry = Registry::new(vec![
            spec("b", None),
            spec_on("e", None, "ios"),
            spec("d", None),
        ]);
        let paths = find_all_paths(&graph(), "a", "d", DEFAULT_MAX_DEPTH);
        let ranked = rank_paths(paths, "a", &registry, "web");

        assert_eq!(ranked.len(), 2);
        let winner: Vec<&str> = ranked[0]
            .steps
            .iter()
            .map(|step| step.status.as_str())
            .collect();
        assert_eq!(winner, vec!["a", "b", "d"]);
        assert!(!ranked[0].has_cross_platform);
        assert!(ranked[1].has_cross_platform);
        assert!(ranked[0].score > ranked[1].score);
    }

    #[test]
    fn candidate_marks_current_and_target_once() {
        let registry = Registry::new(vec![spec("b", None), spec("d", None)]);
        let paths = find_all_paths(&graph(), "a", "d", DEFAULT_MAX_DEPTH);
        let ranked = rank_paths(paths, "a", &registry, "web");

        for candidate in &ranked {
            assert!(candidate.steps[0].is_current);
            let targets = candidate.steps.iter().filter(|s| s.is_target).count();
            assert_eq!(targets, 1);
        }
    }

    /// Repeated calls over the same inputs yield the same ordered list.
    #[test]
    fn ranking_is_deterministic() {
        let registry = Registry::new(vec![spec("b", None), spec("d", None)]);
        let first = rank_paths(
            find_all_paths(&graph(), "a", "d", DEFAULT_MAX_DEPTH),
            "a",
            &registry,
            "web",
        );
        let second = rank_paths(
            find_all_paths(&graph(), "a", "d", DEFAULT_MAX_DEPTH),
            "a",
            &registry,
            "web",
        );
        assert_eq!(first, second);
    }
}
