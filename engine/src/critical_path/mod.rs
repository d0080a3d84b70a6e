//! Critical path resolution.
//!
//! Finds the dependency chain whose accumulated compile time determines
//! total build latency under the active edge set.

mod calculation;
mod types;

pub use calculation::{calculate_critical_path, critical_path, DEFAULT_TIE_EPSILON_MS};
pub use types::CriticalPathResult;
