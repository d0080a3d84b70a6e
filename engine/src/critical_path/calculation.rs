//! Critical path resolution by memoized longest-path search.
//!
//! `finish(u) = duration(u) + max(finish(dep))` over the active dependencies
//! of `u`. A dependency whose own search is still in progress scores 0, which
//! is what keeps the search finite on a cyclic edge set. The resolver runs
//! from scratch on every overlay change.

use std::collections::BTreeMap;

use crate::cycle_guard::VisitSet;
use crate::graph_index::{GraphIndex, UnitIdx};
use crate::models::{DepEdge, Unit, UnitId};

use super::types::CriticalPathResult;

/// Finish times closer than this are treated as tied by [`critical_path`].
pub const DEFAULT_TIE_EPSILON_MS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq)]
enum Visit {
    Unvisited,
    InProgress,
    Done(f64),
}

/// Score every unit with its longest accumulated finish time.
///
/// Iterative DFS so long dependency chains cannot exhaust the stack. Each
/// frame is `(unit, next dependency position, best dependency finish)`.
fn score_finish_times(graph: &GraphIndex) -> Vec<f64> {
    let mut state = vec![Visit::Unvisited; graph.len()];
    let mut stack: Vec<(UnitIdx, usize, f64)> = Vec::new();

    for root in graph.units() {
        if state[root as usize] != Visit::Unvisited {
            continue;
        }
        state[root as usize] = Visit::InProgress;
        stack.push((root, 0, 0.0));

        while let Some(frame) = stack.last_mut() {
            let (idx, pos, best) = *frame;
            let deps = &graph.deps[idx as usize];

            if let Some(&dep) = deps.get(pos) {
                frame.1 += 1;
                match state[dep as usize] {
                    // Cycle break: a unit still being scored adds no depth.
                    Visit::InProgress => {}
                    Visit::Done(finish) => frame.2 = best.max(finish),
                    Visit::Unvisited => {
                        state[dep as usize] = Visit::InProgress;
                        stack.push((dep, 0, 0.0));
                    }
                }
                continue;
            }

            let finish = graph.scored_duration(idx) + best;
            state[idx as usize] = Visit::Done(finish);
            stack.pop();
            if let Some(parent) = stack.last_mut() {
                parent.2 = parent.2.max(finish);
            }
        }
    }

    state
        .into_iter()
        .map(|v| match v {
            Visit::Done(finish) => finish,
            _ => 0.0,
        })
        .collect()
}

/// Highest-scoring candidate; the first one in iteration order wins ties.
fn pick_max(
    candidates: impl Iterator<Item = UnitIdx>,
    finish: &[f64],
    tie_epsilon_ms: f64,
) -> Option<UnitIdx> {
    let mut best: Option<UnitIdx> = None;
    for idx in candidates {
        match best {
            Some(b) if finish[idx as usize] <= finish[b as usize] + tie_epsilon_ms => {}
            _ => best = Some(idx),
        }
    }
    best
}

/// Resolve the critical path over an index built for the active edges.
///
/// The terminal unit is the timed unit with the greatest finish time. The
/// path then follows, at each step, the dependency with the greatest finish
/// time, and stops when no dependency adds positive duration. Untimed units
/// can be stepped through but never appear in the path.
pub(crate) fn calculate_critical_path_indexed(
    graph: &GraphIndex,
    tie_epsilon_ms: f64,
) -> CriticalPathResult {
    let finish = score_finish_times(graph);

    let finish_times: BTreeMap<UnitId, f64> = graph
        .units()
        .filter(|&idx| graph.is_timed(idx))
        .map(|idx| (graph.name(idx).to_string(), finish[idx as usize]))
        .collect();

    let Some(terminal) = pick_max(
        graph.units().filter(|&idx| graph.is_timed(idx)),
        &finish,
        tie_epsilon_ms,
    ) else {
        return CriticalPathResult {
            path: Vec::new(),
            finish_times,
            length_ms: 0.0,
        };
    };

    let mut path = Vec::new();
    let mut on_path = VisitSet::new(graph.len());
    let mut current = terminal;
    loop {
        on_path.insert(current);
        if graph.is_timed(current) {
            path.push(graph.name(current).to_string());
        }

        let deps = graph.deps[current as usize].iter().copied();
        let next = pick_max(deps, &finish, tie_epsilon_ms)
            .filter(|&dep| finish[dep as usize] > tie_epsilon_ms)
            .filter(|&dep| !on_path.contains(dep));
        match next {
            Some(dep) => current = dep,
            None => break,
        }
    }

    CriticalPathResult {
        path,
        finish_times,
        length_ms: finish[terminal as usize],
    }
}

/// Compute the full critical path result for units under `active_edges`.
pub fn calculate_critical_path(
    units: &BTreeMap<UnitId, Unit>,
    active_edges: &[DepEdge],
    tie_epsilon_ms: f64,
) -> CriticalPathResult {
    let graph = GraphIndex::new(units, active_edges);
    calculate_critical_path_indexed(&graph, tie_epsilon_ms)
}

/// Critical path ids, last-finishing unit first.
pub fn critical_path(units: &BTreeMap<UnitId, Unit>, active_edges: &[DepEdge]) -> Vec<UnitId> {
    calculate_critical_path(units, active_edges, DEFAULT_TIE_EPSILON_MS).path
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_units(list: Vec<Unit>) -> BTreeMap<UnitId, Unit> {
        list.into_iter().map(|u| (u.id.clone(), u)).collect()
    }

    fn edges(pairs: &[(&str, &str)]) -> Vec<DepEdge> {
        pairs.iter().map(|(f, t)| DepEdge::new(*f, *t)).collect()
    }

    #[test]
    fn test_empty_graph() {
        let result = calculate_critical_path(&BTreeMap::new(), &[], DEFAULT_TIE_EPSILON_MS);
        assert!(result.is_empty());
        assert_eq!(result.length_ms, 0.0);
    }

    #[test]
    fn test_single_edge() {
        let units = make_units(vec![
            Unit::timed("b", 0.0, 200.0),
            Unit::timed("a", 200.0, 300.0),
        ]);
        let result = calculate_critical_path(&units, &edges(&[("a", "b")]), DEFAULT_TIE_EPSILON_MS);

        assert_eq!(result.path, vec!["a", "b"]);
        assert_eq!(result.length_ms, 500.0);
        assert_eq!(result.finish_times["b"], 200.0);
    }

    #[test]
    fn test_diamond_follows_longer_branch() {
        // d depends on b and c, both depend on a
        let units = make_units(vec![
            Unit::timed("a", 0.0, 2.0),
            Unit::timed("b", 2.0, 3.0),
            Unit::timed("c", 2.0, 5.0),
            Unit::timed("d", 7.0, 1.0),
        ]);
        let active = edges(&[("b", "a"), ("c", "a"), ("d", "b"), ("d", "c")]);

        let result = calculate_critical_path(&units, &active, DEFAULT_TIE_EPSILON_MS);

        assert_eq!(result.path, vec!["d", "c", "a"]);
        assert_eq!(result.length_ms, 8.0);
    }

    #[test]
    fn test_ties_go_to_lowest_id() {
        let units = make_units(vec![
            Unit::timed("y", 0.0, 5.0),
            Unit::timed("x", 0.0, 5.0),
            Unit::timed("top", 5.0, 1.0),
        ]);
        let active = edges(&[("top", "y"), ("top", "x")]);

        let result = calculate_critical_path(&units, &active, DEFAULT_TIE_EPSILON_MS);
        assert_eq!(result.path, vec!["top", "x"]);
    }

    #[test]
    fn test_all_zero_durations_yield_single_unit() {
        let units = make_units(vec![
            Unit::timed("b", 0.0, 0.0),
            Unit::timed("a", 0.0, 0.0),
        ]);
        let result = calculate_critical_path(&units, &edges(&[("a", "b")]), DEFAULT_TIE_EPSILON_MS);

        assert_eq!(result.path, vec!["a"]);
    }

    #[test]
    fn test_untimed_units_excluded_from_path() {
        // top -> ghost (never built) -> base
        let units = make_units(vec![
            Unit::timed("base", 0.0, 100.0),
            Unit::untimed("ghost"),
            Unit::timed("top", 100.0, 10.0),
        ]);
        let active = edges(&[("top", "ghost"), ("ghost", "base")]);

        let result = calculate_critical_path(&units, &active, DEFAULT_TIE_EPSILON_MS);

        assert_eq!(result.path, vec!["top", "base"]);
        assert_eq!(result.length_ms, 110.0);
        assert!(!result.finish_times.contains_key("ghost"));
    }

    #[test]
    fn test_terminates_on_cycle() {
        let units = make_units(vec![
            Unit::timed("a", 0.0, 10.0),
            Unit::timed("b", 0.0, 20.0),
            Unit::timed("c", 0.0, 30.0),
        ]);
        let active = edges(&[("a", "b"), ("b", "c"), ("c", "a")]);

        let result = calculate_critical_path(&units, &active, DEFAULT_TIE_EPSILON_MS);

        // a is scored first: c sees a in progress, so c=30, b=50, a=60.
        assert_eq!(result.path, vec!["a", "b", "c"]);
        assert_eq!(result.length_ms, 60.0);
    }

    #[test]
    fn test_long_chain_does_not_overflow() {
        let n = 50_000;
        let units = make_units((0..n).map(|i| Unit::timed(format!("u{i:06}"), 0.0, 1.0)).collect());
        let active: Vec<DepEdge> = (1..n)
            .map(|i| DepEdge::new(format!("u{i:06}"), format!("u{:06}", i - 1)))
            .collect();

        let result = calculate_critical_path(&units, &active, DEFAULT_TIE_EPSILON_MS);

        assert_eq!(result.path.len(), n);
        assert_eq!(result.length_ms, n as f64);
    }
}
