//! Dense, index-based view of a build graph under one active edge set.

use rustc_hash::{FxHashMap, FxHashSet};
use std::collections::BTreeMap;

use crate::models::{DepEdge, Unit, UnitId};

/// Dense unit index (u32 for compact adjacency lists).
pub type UnitIdx = u32;

/// Pre-computed unit data for fast traversals.
///
/// Indices follow sorted id order, which is the iteration order every
/// traversal uses to break ties. Edges with an unknown endpoint are dropped
/// and duplicate edges collapse to one.
pub struct GraphIndex {
    /// Unit ids, ascending; position is the unit's index.
    ids: Vec<UnitId>,
    lookup: FxHashMap<UnitId, UnitIdx>,
    /// Measured durations indexed by unit.
    pub durations: Vec<Option<f64>>,
    /// Measured start offsets indexed by unit.
    pub starts: Vec<Option<f64>>,
    /// Dependencies of each unit, ascending.
    pub deps: Vec<Vec<UnitIdx>>,
    /// Dependents (reverse edges) of each unit, ascending.
    pub dependents: Vec<Vec<UnitIdx>>,
}

impl GraphIndex {
    pub fn new(units: &BTreeMap<UnitId, Unit>, edges: &[DepEdge]) -> Self {
        // BTreeMap keys are already sorted and unique.
        let ids: Vec<UnitId> = units.keys().cloned().collect();
        let lookup: FxHashMap<UnitId, UnitIdx> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i as UnitIdx))
            .collect();
        let n = ids.len();

        let durations: Vec<Option<f64>> = units.values().map(|u| u.duration_ms).collect();
        let starts: Vec<Option<f64>> = units.values().map(|u| u.start_ms).collect();

        let mut seen: FxHashSet<(UnitIdx, UnitIdx)> =
            FxHashSet::with_capacity_and_hasher(edges.len(), Default::default());
        let mut deps: Vec<Vec<UnitIdx>> = vec![Vec::new(); n];
        let mut dependents: Vec<Vec<UnitIdx>> = vec![Vec::new(); n];
        for edge in edges {
            let (Some(from), Some(to)) = (lookup.get(&edge.from), lookup.get(&edge.to)) else {
                continue;
            };
            let (from, to) = (*from, *to);
            if seen.insert((from, to)) {
                deps[from as usize].push(to);
                dependents[to as usize].push(from);
            }
        }
        for list in deps.iter_mut().chain(dependents.iter_mut()) {
            list.sort_unstable();
        }

        Self {
            ids,
            lookup,
            durations,
            starts,
            deps,
            dependents,
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Index of the unit with this id, if it is known.
    #[inline]
    pub fn get(&self, id: &str) -> Option<UnitIdx> {
        self.lookup.get(id).copied()
    }

    /// Both start and duration were measured.
    #[inline]
    pub fn is_timed(&self, idx: UnitIdx) -> bool {
        let i = idx as usize;
        self.durations[i].is_some() && self.starts[i].is_some()
    }

    /// Duration used for scoring: zero for untimed units.
    #[inline]
    pub fn scored_duration(&self, idx: UnitIdx) -> f64 {
        if self.is_timed(idx) {
            self.durations[idx as usize].unwrap_or(0.0)
        } else {
            0.0
        }
    }

    pub fn name(&self, idx: UnitIdx) -> &str {
        self.ids.get(idx as usize).map_or("", String::as_str)
    }

    pub fn units(&self) -> impl Iterator<Item = UnitIdx> {
        0..self.len() as UnitIdx
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn units(list: Vec<Unit>) -> BTreeMap<UnitId, Unit> {
        list.into_iter().map(|u| (u.id.clone(), u)).collect()
    }

    #[test]
    fn test_drops_unknown_endpoints_and_duplicates() {
        let units = units(vec![Unit::timed("b", 0.0, 1.0), Unit::timed("a", 1.0, 1.0)]);
        let edges = vec![
            DepEdge::new("a", "b"),
            DepEdge::new("a", "b"),
            DepEdge::new("a", "ghost"),
            DepEdge::new("ghost", "b"),
        ];
        let graph = GraphIndex::new(&units, &edges);

        let a = graph.get("a").unwrap();
        let b = graph.get("b").unwrap();
        assert_eq!(graph.deps[a as usize], vec![b]);
        assert_eq!(graph.dependents[b as usize], vec![a]);
        assert!(graph.deps[b as usize].is_empty());
    }

    #[test]
    fn test_indices_follow_sorted_ids() {
        let units = units(vec![Unit::untimed("zeta"), Unit::timed("alpha", 0.0, 2.0)]);
        let graph = GraphIndex::new(&units, &[]);

        assert_eq!(graph.name(0), "alpha");
        assert_eq!(graph.name(1), "zeta");
        assert!(graph.is_timed(0));
        assert!(!graph.is_timed(1));
        assert_eq!(graph.scored_duration(1), 0.0);
        assert_eq!(graph.get("zeta"), Some(1));
        assert_eq!(graph.get("missing"), None);
    }
}
