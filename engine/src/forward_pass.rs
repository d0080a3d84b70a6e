//! Forward pass: incremental start-time propagation for hypothetical edits.
//!
//! Only units whose own dependency set changed are recomputed directly. The
//! change then flows to their dependents in topological order, so on an
//! acyclic edge set every unit sees the final start of each dependency.
//! Units left behind by a cycle are finalized one at a time, lowest id
//! first, each at most once, which keeps the pass finite.
//!
//! A measured start usually sits some time after the unit's last dependency
//! finished (waiting for a jobserver slot). That wait is kept: a recomputed
//! unit starts at its new earliest start plus the wait it had in the
//! measured build.

use rustc_hash::FxHashSet;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::cycle_guard::VisitSet;
use crate::graph_index::{GraphIndex, UnitIdx};
use crate::models::{DepEdge, EdgeKey, Unit, UnitId};
use crate::{log_checks, log_debug};

/// Result from the forward pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForwardPassResult {
    /// Start for every known unit (0 for units never measured).
    pub start_times: BTreeMap<UnitId, f64>,
    /// Units whose start differs from the measured value.
    pub changed: BTreeSet<UnitId>,
    /// Number of units finalized during propagation.
    pub visited: usize,
}

/// Earliest start given the current start of each dependency.
///
/// Untimed dependencies contribute nothing.
fn earliest_start(graph: &GraphIndex, starts: &[f64], idx: UnitIdx) -> f64 {
    graph.deps[idx as usize]
        .iter()
        .filter(|&&dep| graph.is_timed(dep))
        .map(|&dep| starts[dep as usize] + graph.scored_duration(dep))
        .fold(0.0, f64::max)
}

/// Units whose immediate dependency set differs from the base graph:
/// sources of removed base edges and sources of active edges missing from
/// the base. Removed keys that were never base edges change nothing.
fn directly_affected(
    graph: &GraphIndex,
    active_edges: &[DepEdge],
    base_edges: &[DepEdge],
    removed: &[EdgeKey],
) -> Vec<UnitIdx> {
    let base: FxHashSet<(&str, &str)> = base_edges
        .iter()
        .map(|e| (e.from.as_str(), e.to.as_str()))
        .collect();

    let mut affected: Vec<UnitIdx> = removed
        .iter()
        .filter(|key| base.contains(&(key.from.as_str(), key.to.as_str())))
        .filter_map(|key| graph.get(&key.from))
        .chain(
            active_edges
                .iter()
                .filter(|e| !base.contains(&(e.from.as_str(), e.to.as_str())))
                .filter_map(|e| graph.get(&e.from)),
        )
        .collect();
    affected.sort_unstable();
    affected.dedup();
    affected
}

/// Every unit reachable from `seeds` along the dependents relation.
fn downstream_of(graph: &GraphIndex, seeds: &[UnitIdx]) -> VisitSet {
    let mut reached = VisitSet::new(graph.len());
    let mut queue: VecDeque<UnitIdx> = VecDeque::new();
    for &seed in seeds {
        if reached.insert(seed) {
            queue.push_back(seed);
        }
    }
    while let Some(idx) = queue.pop_front() {
        for &dependent in &graph.dependents[idx as usize] {
            if reached.insert(dependent) {
                queue.push_back(dependent);
            }
        }
    }
    reached
}

/// Start times before any edit, plus the earliest start each unit had under
/// the base edges. Their difference is the unit's measured wait.
struct MeasuredStarts {
    starts: Vec<f64>,
    base_earliest: Vec<f64>,
}

impl MeasuredStarts {
    fn new(units: &BTreeMap<UnitId, Unit>, base_edges: &[DepEdge]) -> Self {
        let base = GraphIndex::new(units, base_edges);
        let starts: Vec<f64> = base.starts.iter().map(|s| s.unwrap_or(0.0)).collect();
        let base_earliest = base
            .units()
            .map(|idx| earliest_start(&base, &starts, idx))
            .collect();
        Self {
            starts,
            base_earliest,
        }
    }

    /// Start of `idx` once its dependencies allow it to begin at `earliest`.
    fn shifted(&self, idx: UnitIdx, earliest: f64) -> f64 {
        let i = idx as usize;
        if earliest == self.base_earliest[i] {
            return self.starts[i];
        }
        let wait = (self.starts[i] - self.base_earliest[i]).max(0.0);
        earliest + wait
    }
}

/// Recompute start times after an overlay edit.
///
/// # Arguments
/// * `units` - All known units, keyed by id
/// * `active_edges` - Edges after applying the overlay
/// * `base_edges` - The committed edges the measured starts came from
/// * `removed` - Edge keys the overlay removed from the base
/// * `verbosity` - Logging verbosity (see [`crate::logging`])
pub fn propagate_start_times(
    units: &BTreeMap<UnitId, Unit>,
    active_edges: &[DepEdge],
    base_edges: &[DepEdge],
    removed: &[EdgeKey],
    verbosity: u8,
) -> ForwardPassResult {
    let graph = GraphIndex::new(units, active_edges);
    let measured = MeasuredStarts::new(units, base_edges);
    let mut starts = measured.starts.clone();

    let affected = directly_affected(&graph, active_edges, base_edges, removed);
    let scope = downstream_of(&graph, &affected);
    log_checks!(
        verbosity,
        "{} units affected directly, {} downstream",
        affected.len(),
        scope.count()
    );

    // Kahn's algorithm restricted to the downstream units.
    let mut pending: Vec<usize> = vec![0; graph.len()];
    let mut queue: VecDeque<UnitIdx> = VecDeque::new();
    for idx in graph.units().filter(|&idx| scope.contains(idx)) {
        pending[idx as usize] = graph.deps[idx as usize]
            .iter()
            .filter(|&&dep| scope.contains(dep))
            .count();
        if pending[idx as usize] == 0 {
            queue.push_back(idx);
        }
    }

    let mut visited = VisitSet::new(graph.len());
    let mut cycle_cursor = graph.units();
    loop {
        let idx = match queue.pop_front() {
            Some(idx) => idx,
            // Only cycles can stall the queue; break them at the lowest id.
            None => match cycle_cursor.find(|&idx| scope.contains(idx) && !visited.contains(idx)) {
                Some(idx) => {
                    log_debug!(verbosity, "{}: finalized inside a cycle", graph.name(idx));
                    idx
                }
                None => break,
            },
        };
        if !visited.insert(idx) {
            continue;
        }

        let start = measured.shifted(idx, earliest_start(&graph, &starts, idx));
        if start != starts[idx as usize] {
            log_debug!(
                verbosity,
                "{}: start {} -> {}",
                graph.name(idx),
                starts[idx as usize],
                start
            );
            starts[idx as usize] = start;
        }

        for &dependent in &graph.dependents[idx as usize] {
            if !scope.contains(dependent) || visited.contains(dependent) {
                continue;
            }
            pending[dependent as usize] -= 1;
            if pending[dependent as usize] == 0 {
                queue.push_back(dependent);
            }
        }
    }

    let mut changed = BTreeSet::new();
    let mut start_times = BTreeMap::new();
    for idx in graph.units() {
        let id = graph.name(idx).to_string();
        let start = starts[idx as usize];
        if start != measured.starts[idx as usize] {
            changed.insert(id.clone());
        }
        start_times.insert(id, start);
    }

    ForwardPassResult {
        start_times,
        changed,
        visited: visited.count(),
    }
}
