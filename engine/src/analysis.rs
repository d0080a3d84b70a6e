//! One-shot analysis of a build graph under an edge overlay.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::config::AnalysisConfig;
use crate::critical_path::calculate_critical_path;
use crate::forward_pass::propagate_start_times;
use crate::log_changes;
use crate::models::{BuildGraph, DepEdge, EdgeKey, Unit, UnitId};
use crate::overlay::{resolve_active_edges, EdgeOverlay};

/// Everything the viewer needs to draw one state of the graph.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Analysis {
    pub active_edges: Vec<DepEdge>,
    /// Start offsets (ms) for timed units.
    pub start_times: BTreeMap<UnitId, f64>,
    /// Latest finish over all timed units (ms).
    pub total_duration_ms: f64,
    /// Unit ids on the critical path, last-finishing unit first.
    pub critical_path: Vec<UnitId>,
    /// Accumulated duration along the critical path (ms).
    pub critical_path_ms: f64,
}

/// Difference between two analyses of the same units.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AnalysisDelta {
    /// Change in total duration (negative = faster build).
    pub total_duration_ms: f64,
    /// Per-unit start shift, only for units that moved.
    pub start_shifts: BTreeMap<UnitId, f64>,
    pub critical_path_changed: bool,
}

impl Analysis {
    /// Compare against a baseline analysis.
    pub fn delta_from(&self, baseline: &Analysis) -> AnalysisDelta {
        let start_shifts = self
            .start_times
            .iter()
            .filter_map(|(id, &start)| {
                let before = baseline.start_times.get(id).copied()?;
                let shift = start - before;
                (shift != 0.0).then(|| (id.clone(), shift))
            })
            .collect();

        AnalysisDelta {
            total_duration_ms: self.total_duration_ms - baseline.total_duration_ms,
            start_shifts,
            critical_path_changed: self.critical_path != baseline.critical_path,
        }
    }

    pub fn to_json_string(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Latest `start + duration` over timed units, using `start_times` where present.
pub fn total_duration(units: &BTreeMap<UnitId, Unit>, start_times: &BTreeMap<UnitId, f64>) -> f64 {
    units
        .values()
        .filter(|u| u.is_timed())
        .filter_map(|u| {
            let start = start_times.get(&u.id).copied().or(u.start_ms)?;
            Some(start + u.duration_ms?)
        })
        .fold(0.0, f64::max)
}

/// Analyze `graph` with `overlay` applied.
///
/// Start times are propagated incrementally from the measured ones; the
/// critical path is resolved from scratch over the active edges.
pub fn analyze(graph: &BuildGraph, overlay: &EdgeOverlay, config: &AnalysisConfig) -> Analysis {
    let active_edges = resolve_active_edges(&graph.edges, overlay);
    let removed: Vec<EdgeKey> = overlay.removed().cloned().collect();

    let forward = propagate_start_times(
        &graph.nodes,
        &active_edges,
        &graph.edges,
        &removed,
        config.verbosity,
    );
    let start_times: BTreeMap<UnitId, f64> = forward
        .start_times
        .into_iter()
        .filter(|(id, _)| graph.nodes.get(id).is_some_and(Unit::is_timed))
        .collect();
    let total_duration_ms = total_duration(&graph.nodes, &start_times);

    let critical = calculate_critical_path(&graph.nodes, &active_edges, config.tie_epsilon_ms);

    log_changes!(
        config.verbosity,
        overrides = overlay.len(),
        moved = forward.changed.len(),
        "total {:.0}ms, critical path {} units ({:.0}ms)",
        total_duration_ms,
        critical.path.len(),
        critical.length_ms
    );

    Analysis {
        active_edges,
        start_times,
        total_duration_ms,
        critical_path: critical.path,
        critical_path_ms: critical.length_ms,
    }
}
