//! Types for critical path resolution.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::models::UnitId;

/// Result of critical path resolution over one active edge set.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CriticalPathResult {
    /// Unit ids on the critical path, last-finishing unit first.
    pub path: Vec<UnitId>,
    /// Longest accumulated duration ending at each unit (ms).
    pub finish_times: BTreeMap<UnitId, f64>,
    /// Accumulated duration of the whole path (ms).
    pub length_ms: f64,
}

impl CriticalPathResult {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_empty() {
        let result = CriticalPathResult {
            path: vec!["a".to_string(), "b".to_string()],
            finish_times: BTreeMap::new(),
            length_ms: 500.0,
        };
        assert!(!result.is_empty());
        assert!(CriticalPathResult::default().is_empty());
    }
}
