//! Core data types for the build graph.
//!
//! These mirror the payload the timing collector hands to the viewer: crate
//! nodes keyed by id, "depends on" edges, the workspace roots and the
//! critical path computed over the measured build.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Stable identifier of a build unit (a cargo package id).
pub type UnitId = String;

/// Separator used in the textual form of an [`EdgeKey`].
///
/// Cargo package ids never contain this sequence.
pub const EDGE_KEY_SEPARATOR: &str = " -> ";

/// Errors raised while loading or decoding graph data.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Malformed edge key: {0:?}")]
    MalformedEdgeKey(String),

    #[error("Invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A single compiled artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Unit {
    pub id: UnitId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub is_workspace_member: bool,
    /// Compilation duration in milliseconds, None if not yet built.
    #[serde(default)]
    pub duration_ms: Option<f64>,
    /// When this unit started compiling (ms from build start), None if not yet built.
    #[serde(default)]
    pub start_ms: Option<f64>,
    /// Whether the artifact was fresh (cached) during the measured build.
    #[serde(default)]
    pub fresh: bool,
    #[serde(default)]
    pub features: Vec<String>,
}

impl Unit {
    /// Create a unit with measured timing and no package metadata.
    pub fn timed(id: impl Into<UnitId>, start_ms: f64, duration_ms: f64) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: String::new(),
            is_workspace_member: false,
            duration_ms: Some(duration_ms),
            start_ms: Some(start_ms),
            fresh: false,
            features: Vec::new(),
        }
    }

    /// Create a unit that was never built.
    pub fn untimed(id: impl Into<UnitId>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            version: String::new(),
            is_workspace_member: false,
            duration_ms: None,
            start_ms: None,
            fresh: false,
            features: Vec::new(),
        }
    }

    /// Both start and duration were measured.
    pub fn is_timed(&self) -> bool {
        self.duration_ms.is_some() && self.start_ms.is_some()
    }

    /// Measured finish offset, if the unit is timed.
    pub fn finish_ms(&self) -> Option<f64> {
        Some(self.start_ms? + self.duration_ms?)
    }
}

/// Identity of a dependency edge: `from` depends on `to`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct EdgeKey {
    pub from: UnitId,
    pub to: UnitId,
}

impl EdgeKey {
    pub fn new(from: impl Into<UnitId>, to: impl Into<UnitId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.from, EDGE_KEY_SEPARATOR, self.to)
    }
}

impl FromStr for EdgeKey {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (from, to) = s
            .split_once(EDGE_KEY_SEPARATOR)
            .ok_or_else(|| ModelError::MalformedEdgeKey(s.to_string()))?;
        if from.is_empty() || to.is_empty() || to.contains(EDGE_KEY_SEPARATOR) {
            return Err(ModelError::MalformedEdgeKey(s.to_string()));
        }
        Ok(Self::new(from, to))
    }
}

impl From<EdgeKey> for String {
    fn from(key: EdgeKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for EdgeKey {
    type Error = ModelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// A "depends on" edge: `to` must finish before `from` may start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DepEdge {
    pub from: UnitId,
    pub to: UnitId,
    /// Cargo dependency kinds (`Normal`, `Build`, `Development`).
    #[serde(default)]
    pub dep_kinds: Vec<String>,
}

impl DepEdge {
    pub fn new(from: impl Into<UnitId>, to: impl Into<UnitId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            dep_kinds: Vec::new(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }

    #[inline]
    pub(crate) fn matches(&self, key: &EdgeKey) -> bool {
        self.from == key.from && self.to == key.to
    }
}

impl From<&EdgeKey> for DepEdge {
    fn from(key: &EdgeKey) -> Self {
        Self::new(key.from.clone(), key.to.clone())
    }
}

/// The committed graph as received from the timing collector.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildGraph {
    pub nodes: BTreeMap<UnitId, Unit>,
    pub edges: Vec<DepEdge>,
    #[serde(default)]
    pub roots: Vec<UnitId>,
    /// Unit ids on the critical path, last-finishing unit first.
    #[serde(default)]
    pub critical_path: Vec<UnitId>,
}

impl BuildGraph {
    /// Build a graph from units and edges, with no roots or critical path.
    pub fn new(units: impl IntoIterator<Item = Unit>, edges: Vec<DepEdge>) -> Self {
        Self {
            nodes: units.into_iter().map(|u| (u.id.clone(), u)).collect(),
            edges,
            roots: Vec::new(),
            critical_path: Vec::new(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, ModelError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Replace `critical_path` with the one computed over the base edges.
    pub fn with_computed_critical_path(mut self) -> Self {
        self.critical_path = crate::critical_path::critical_path(&self.nodes, &self.edges);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_key_display_and_parse() {
        let key = EdgeKey::new("app 0.1.0", "serde 1.0.0");
        let text = key.to_string();
        assert_eq!(text, "app 0.1.0 -> serde 1.0.0");
        assert_eq!(text.parse::<EdgeKey>().unwrap(), key);
    }

    #[test]
    fn test_edge_key_rejects_malformed() {
        assert!("no-separator".parse::<EdgeKey>().is_err());
        assert!(" -> b".parse::<EdgeKey>().is_err());
        assert!("a -> b -> c".parse::<EdgeKey>().is_err());
    }

    #[test]
    fn test_unit_timing_helpers() {
        let unit = Unit::timed("a", 200.0, 300.0);
        assert!(unit.is_timed());
        assert_eq!(unit.finish_ms(), Some(500.0));

        let unit = Unit::untimed("b");
        assert!(!unit.is_timed());
        assert_eq!(unit.finish_ms(), None);
    }

    #[test]
    fn test_graph_json_from_collector() {
        let json = r#"{
            "nodes": {
                "app": {"id": "app", "name": "app", "version": "0.1.0",
                        "is_workspace_member": true, "duration_ms": 300.0,
                        "start_ms": 200.0, "fresh": false, "features": ["default"]},
                "dep": {"id": "dep", "name": "dep", "version": "1.0.0",
                        "is_workspace_member": false, "duration_ms": null,
                        "start_ms": null, "fresh": false, "features": []}
            },
            "edges": [{"from": "app", "to": "dep", "dep_kinds": ["Normal"]}],
            "roots": ["app"],
            "critical_path": ["app"]
        }"#;

        let graph = BuildGraph::from_json_str(json).unwrap();
        assert_eq!(graph.nodes.len(), 2);
        assert!(graph.nodes["app"].is_workspace_member);
        assert_eq!(graph.nodes["app"].duration_ms, Some(300.0));
        assert!(!graph.nodes["dep"].is_timed());
        assert_eq!(graph.edges[0].key(), EdgeKey::new("app", "dep"));
        assert_eq!(graph.edges[0].dep_kinds, vec!["Normal".to_string()]);
        assert_eq!(graph.roots, vec!["app".to_string()]);

        let reloaded = BuildGraph::from_json_str(&graph.to_json_string().unwrap()).unwrap();
        assert_eq!(reloaded, graph);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = BuildGraph::from_json_str("{\"nodes\": 3}").unwrap_err();
        assert!(matches!(err, ModelError::Json(_)));
    }

    #[test]
    fn test_with_computed_critical_path() {
        let graph = BuildGraph::new(
            [Unit::timed("b", 0.0, 200.0), Unit::timed("a", 200.0, 300.0)],
            vec![DepEdge::new("a", "b")],
        )
        .with_computed_critical_path();

        assert_eq!(graph.critical_path, vec!["a".to_string(), "b".to_string()]);
    }
}
