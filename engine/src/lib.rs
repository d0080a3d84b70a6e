//! What-if engine for compilation timing graphs.
//!
//! Given the crates of a measured build, their "depends on" edges and the
//! measured start/duration of each crate, this crate answers two questions:
//! which dependency chain determines total build latency (the critical path),
//! and what total latency becomes when dependencies are hypothetically added
//! or removed.
//!
//! The engine is pure: every entry point takes the committed graph plus an
//! [`EdgeOverlay`] and returns fresh values. Edits that would introduce a
//! cycle are rejected up front by [`would_create_cycle`]; the traversals
//! additionally visit each unit at most once, so they terminate even if a
//! cyclic edge set slips through.

pub mod analysis;
pub mod config;
pub mod critical_path;
pub mod cycle_guard;
pub mod forward_pass;
mod graph_index;
pub mod logging;
pub mod models;
pub mod overlay;
pub mod session;

pub use analysis::{analyze, total_duration, Analysis, AnalysisDelta};
pub use config::AnalysisConfig;
pub use critical_path::{calculate_critical_path, critical_path, CriticalPathResult};
pub use cycle_guard::would_create_cycle;
pub use forward_pass::{propagate_start_times, ForwardPassResult};
pub use models::{BuildGraph, DepEdge, EdgeKey, ModelError, Unit, UnitId, EDGE_KEY_SEPARATOR};
pub use overlay::{resolve_active_edges, EdgeOverlay, EdgeOverride};
pub use session::{SessionError, WhatIfSession};
