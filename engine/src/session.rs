//! Interactive what-if session over a committed build graph.
//!
//! The session owns the overlay the viewer edits. Every edit goes through
//! here so additions are checked by the cycle guard before they are
//! committed; analysis itself stays a pure function of graph + overlay.

use rustc_hash::FxHashSet;
use thiserror::Error;

use crate::analysis::{analyze, Analysis};
use crate::config::AnalysisConfig;
use crate::cycle_guard::{build_dependents_map, transitive_dependents, would_create_cycle};
use crate::models::{BuildGraph, DepEdge, EdgeKey, UnitId};
use crate::overlay::{resolve_active_edges, EdgeOverlay, EdgeOverride};
use crate::{log_changes, log_checks};

/// Rejected overlay edits.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Adding dependency {from} -> {to} would create a cycle")]
    WouldCreateCycle { from: UnitId, to: UnitId },
}

/// A base graph plus the hypothetical edits applied to it.
#[derive(Debug, Clone)]
pub struct WhatIfSession {
    graph: BuildGraph,
    overlay: EdgeOverlay,
    active_edges: Vec<DepEdge>,
    config: AnalysisConfig,
}

impl WhatIfSession {
    pub fn new(graph: BuildGraph, config: AnalysisConfig) -> Self {
        let overlay = EdgeOverlay::new();
        let active_edges = resolve_active_edges(&graph.edges, &overlay);
        Self {
            graph,
            overlay,
            active_edges,
            config,
        }
    }

    /// Restore a session from previously saved overlay keys.
    ///
    /// Keys are applied in order through [`Self::add_dependency`] and
    /// [`Self::remove_dependency`], so additions that would now close a cycle
    /// are skipped.
    pub fn with_overlay(graph: BuildGraph, overlay: &EdgeOverlay, config: AnalysisConfig) -> Self {
        let mut session = Self::new(graph, config);
        for key in overlay.removed() {
            session.remove_dependency(&key.from, &key.to);
        }
        for key in overlay.added() {
            if let Err(err) = session.add_dependency(&key.from, &key.to) {
                log_checks!(session.config.verbosity, "skipping saved edit: {}", err);
            }
        }
        session
    }

    pub fn graph(&self) -> &BuildGraph {
        &self.graph
    }

    pub fn overlay(&self) -> &EdgeOverlay {
        &self.overlay
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn active_edges(&self) -> &[DepEdge] {
        &self.active_edges
    }

    fn is_active(&self, from: &str, to: &str) -> bool {
        self.active_edges.iter().any(|e| e.from == from && e.to == to)
    }

    fn in_base(&self, key: &EdgeKey) -> bool {
        self.graph.edges.iter().any(|e| e.matches(key))
    }

    fn refresh(&mut self) {
        self.active_edges = resolve_active_edges(&self.graph.edges, &self.overlay);
    }

    /// Make `from` depend on `to`.
    ///
    /// Returns `Ok(true)` if the active edges changed. Unknown units and edges
    /// that are already active are ignored. An edge that would close a cycle
    /// is rejected and the overlay is left untouched.
    pub fn add_dependency(&mut self, from: &str, to: &str) -> Result<bool, SessionError> {
        if !self.graph.contains(from) || !self.graph.contains(to) {
            log_checks!(self.config.verbosity, "ignoring edge to unknown unit: {} -> {}", from, to);
            return Ok(false);
        }
        if self.is_active(from, to) {
            return Ok(false);
        }
        if would_create_cycle(&self.active_edges, from, to) {
            log_checks!(self.config.verbosity, "rejected {} -> {}: cycle", from, to);
            return Err(SessionError::WouldCreateCycle {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let key = EdgeKey::new(from, to);
        if self.in_base(&key) {
            // Re-adding a removed base edge just undoes the removal.
            self.overlay.clear(&key);
        } else {
            self.overlay.add(key);
        }
        log_changes!(self.config.verbosity, "added dependency {} -> {}", from, to);
        self.refresh();
        Ok(true)
    }

    /// Drop the dependency of `from` on `to`.
    ///
    /// Returns true if the active edges changed; removing an inactive edge
    /// is a no-op.
    pub fn remove_dependency(&mut self, from: &str, to: &str) -> bool {
        if !self.is_active(from, to) {
            return false;
        }

        let key = EdgeKey::new(from, to);
        if self.overlay.get(&key) == Some(EdgeOverride::Added) {
            self.overlay.clear(&key);
        } else {
            self.overlay.remove(key);
        }
        log_changes!(self.config.verbosity, "removed dependency {} -> {}", from, to);
        self.refresh();
        true
    }

    /// Discard every hypothetical edit.
    pub fn reset(&mut self) {
        self.overlay.reset();
        self.refresh();
    }

    /// Active dependencies of `id`, in edge order.
    pub fn dependencies_of(&self, id: &str) -> Vec<&str> {
        self.active_edges
            .iter()
            .filter(|e| e.from == id)
            .map(|e| e.to.as_str())
            .collect()
    }

    /// Active dependents of `id`, in edge order.
    pub fn dependents_of(&self, id: &str) -> Vec<&str> {
        self.active_edges
            .iter()
            .filter(|e| e.to == id)
            .map(|e| e.from.as_str())
            .collect()
    }

    /// Units that could become a new dependency of `from` without closing a
    /// cycle, in id order. Units `from` already depends on are left out.
    pub fn dependency_candidates(&self, from: &str) -> Vec<&str> {
        if !self.graph.contains(from) {
            return Vec::new();
        }
        let dependents = build_dependents_map(&self.active_edges);
        let blocked = transitive_dependents(&dependents, from);
        let existing: FxHashSet<&str> = self.dependencies_of(from).into_iter().collect();

        self.graph
            .nodes
            .keys()
            .map(String::as_str)
            .filter(|id| !blocked.contains(id) && !existing.contains(id))
            .collect()
    }

    /// Analyze the graph with the current edits applied.
    pub fn analyze(&self) -> Analysis {
        analyze(&self.graph, &self.overlay, &self.config)
    }
}
