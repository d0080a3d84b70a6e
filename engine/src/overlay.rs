//! Hypothetical edits layered over the committed edge set.
//!
//! An [`EdgeOverlay`] stores at most one override per edge key, so an edge
//! can never be both removed and added at the same time.

use rustc_hash::FxHashSet;
use std::collections::BTreeMap;

use crate::models::{DepEdge, EdgeKey, ModelError};

/// Override applied to one edge key. Keys with no override are unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeOverride {
    Removed,
    Added,
}

/// Set of edge overrides, ordered by key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EdgeOverlay {
    overrides: BTreeMap<EdgeKey, EdgeOverride>,
}

impl EdgeOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an overlay from the presentation layer's removed/added key lists.
    ///
    /// A key listed in both is ambiguous; the later `added` entry wins so the
    /// result stays disjoint.
    pub fn from_keys<R, A>(removed: R, added: A) -> Result<Self, ModelError>
    where
        R: IntoIterator,
        R::Item: AsRef<str>,
        A: IntoIterator,
        A::Item: AsRef<str>,
    {
        let mut overlay = Self::new();
        for key in removed {
            overlay.remove(key.as_ref().parse()?);
        }
        for key in added {
            overlay.add(key.as_ref().parse()?);
        }
        Ok(overlay)
    }

    /// Textual removed and added keys, each in key order.
    pub fn to_keys(&self) -> (Vec<String>, Vec<String>) {
        (
            self.removed().map(ToString::to_string).collect(),
            self.added().map(ToString::to_string).collect(),
        )
    }

    /// Mark `key` as removed, replacing any prior override.
    pub fn remove(&mut self, key: EdgeKey) {
        self.overrides.insert(key, EdgeOverride::Removed);
    }

    /// Mark `key` as added, replacing any prior override.
    pub fn add(&mut self, key: EdgeKey) {
        self.overrides.insert(key, EdgeOverride::Added);
    }

    /// Drop any override for `key`, returning the one that was set.
    pub fn clear(&mut self, key: &EdgeKey) -> Option<EdgeOverride> {
        self.overrides.remove(key)
    }

    pub fn reset(&mut self) {
        self.overrides.clear();
    }

    pub fn get(&self, key: &EdgeKey) -> Option<EdgeOverride> {
        self.overrides.get(key).copied()
    }

    pub fn removed(&self) -> impl Iterator<Item = &EdgeKey> {
        self.keys_with(EdgeOverride::Removed)
    }

    pub fn added(&self) -> impl Iterator<Item = &EdgeKey> {
        self.keys_with(EdgeOverride::Added)
    }

    pub fn is_empty(&self) -> bool {
        self.overrides.is_empty()
    }

    pub fn len(&self) -> usize {
        self.overrides.len()
    }

    fn keys_with(&self, wanted: EdgeOverride) -> impl Iterator<Item = &EdgeKey> {
        self.overrides
            .iter()
            .filter(move |(_, &o)| o == wanted)
            .map(|(k, _)| k)
    }
}

/// Merge the base edges with an overlay: `(base - removed) ∪ added`.
///
/// Duplicate base edges collapse to their first occurrence. Base order is
/// kept and additions follow in key order. Removed keys that are not in the
/// base are ignored.
pub fn resolve_active_edges(base: &[DepEdge], overlay: &EdgeOverlay) -> Vec<DepEdge> {
    let mut seen: FxHashSet<(&str, &str)> =
        FxHashSet::with_capacity_and_hasher(base.len(), Default::default());
    let mut active = Vec::with_capacity(base.len());

    for edge in base {
        if !seen.insert((edge.from.as_str(), edge.to.as_str())) {
            continue;
        }
        if overlay.get(&edge.key()) == Some(EdgeOverride::Removed) {
            continue;
        }
        active.push(edge.clone());
    }

    for key in overlay.added() {
        if seen.insert((key.from.as_str(), key.to.as_str())) {
            active.push(DepEdge::from(key));
        }
    }

    active
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(edges: &[DepEdge]) -> Vec<String> {
        edges.iter().map(|e| e.key().to_string()).collect()
    }

    #[test]
    fn test_empty_overlay_is_identity() {
        let base = vec![DepEdge::new("a", "b"), DepEdge::new("b", "c")];
        let active = resolve_active_edges(&base, &EdgeOverlay::new());
        assert_eq!(active, base);
    }

    #[test]
    fn test_remove_and_add() {
        let base = vec![DepEdge::new("a", "b"), DepEdge::new("b", "c")];
        let mut overlay = EdgeOverlay::new();
        overlay.remove(EdgeKey::new("a", "b"));
        overlay.add(EdgeKey::new("a", "c"));

        let active = resolve_active_edges(&base, &overlay);
        assert_eq!(keys(&active), vec!["b -> c", "a -> c"]);
    }

    #[test]
    fn test_removed_key_not_in_base_is_noop() {
        let base = vec![DepEdge::new("a", "b")];
        let mut overlay = EdgeOverlay::new();
        overlay.remove(EdgeKey::new("x", "y"));

        assert_eq!(resolve_active_edges(&base, &overlay), base);
    }

    #[test]
    fn test_duplicates_collapse() {
        let base = vec![DepEdge::new("a", "b"), DepEdge::new("a", "b")];
        let mut overlay = EdgeOverlay::new();
        overlay.add(EdgeKey::new("a", "b"));

        assert_eq!(keys(&resolve_active_edges(&base, &overlay)), vec!["a -> b"]);
    }

    #[test]
    fn test_override_replaces_previous() {
        let key = EdgeKey::new("a", "b");
        let mut overlay = EdgeOverlay::new();
        overlay.remove(key.clone());
        overlay.add(key.clone());

        assert_eq!(overlay.get(&key), Some(EdgeOverride::Added));
        assert_eq!(overlay.removed().count(), 0);
        assert_eq!(overlay.len(), 1);

        assert_eq!(overlay.clear(&key), Some(EdgeOverride::Added));
        assert!(overlay.is_empty());
    }

    #[test]
    fn test_keys_round_trip_through_text() {
        let overlay = EdgeOverlay::from_keys(["a -> b"], ["c -> d", "a -> c"]).unwrap();
        let (removed, added) = overlay.to_keys();
        assert_eq!(removed, vec!["a -> b"]);
        assert_eq!(added, vec!["a -> c", "c -> d"]);

        assert!(EdgeOverlay::from_keys(["bogus"], Vec::<String>::new()).is_err());
    }
}
