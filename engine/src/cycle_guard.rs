//! Cycle guard: the proactive "would this edge close a cycle" check, plus the
//! visited-once bookkeeping that keeps traversals finite on cyclic input.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::VecDeque;

use crate::graph_index::UnitIdx;
use crate::models::DepEdge;

/// Reverse dependency map: unit id -> ids of units that depend on it.
pub type DependentsMap<'a> = FxHashMap<&'a str, Vec<&'a str>>;

/// Build a dependents map from an edge list.
pub fn build_dependents_map(edges: &[DepEdge]) -> DependentsMap<'_> {
    let mut dependents: DependentsMap =
        FxHashMap::with_capacity_and_hasher(edges.len(), Default::default());
    for edge in edges {
        dependents
            .entry(edge.to.as_str())
            .or_default()
            .push(edge.from.as_str());
    }
    dependents
}

/// All units that transitively depend on `id`, including `id` itself.
pub fn transitive_dependents<'a>(dependents: &DependentsMap<'a>, id: &'a str) -> FxHashSet<&'a str> {
    let mut reached: FxHashSet<&str> = FxHashSet::default();
    let mut queue: VecDeque<&str> = VecDeque::new();

    reached.insert(id);
    queue.push_back(id);

    while let Some(current) = queue.pop_front() {
        let Some(next) = dependents.get(current) else {
            continue;
        };
        for &dependent in next {
            if reached.insert(dependent) {
                queue.push_back(dependent);
            }
        }
    }

    reached
}

/// Whether adding `from -> to` (from depends on to) would close a cycle.
///
/// True iff `to` already depends on `from`, directly or transitively, under
/// `active_edges`. A self-edge always closes a cycle.
pub fn would_create_cycle(active_edges: &[DepEdge], from: &str, to: &str) -> bool {
    if from == to {
        return true;
    }
    let dependents = build_dependents_map(active_edges);
    transitive_dependents(&dependents, from).contains(to)
}

/// Visited-once marker over dense unit indices.
#[derive(Debug, Clone)]
pub struct VisitSet {
    visited: Vec<bool>,
}

impl VisitSet {
    pub fn new(len: usize) -> Self {
        Self {
            visited: vec![false; len],
        }
    }

    /// Mark `idx` visited. Returns false if it already was.
    #[inline]
    pub fn insert(&mut self, idx: UnitIdx) -> bool {
        let slot = &mut self.visited[idx as usize];
        !std::mem::replace(slot, true)
    }

    #[inline]
    pub fn contains(&self, idx: UnitIdx) -> bool {
        self.visited[idx as usize]
    }

    pub fn count(&self) -> usize {
        self.visited.iter().filter(|&&v| v).count()
    }
}
