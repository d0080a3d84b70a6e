//! Configuration types for the what-if engine.

use serde::Deserialize;

use crate::models::ModelError;

/// Configuration for graph analysis.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Verbosity level: 0=silent, 1=changes, 2=checks, 3=debug.
    pub verbosity: u8,
    /// Finish times closer than this (ms) are treated as tied when choosing
    /// the critical path; the lower-sorting id wins a tie.
    pub tie_epsilon_ms: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            verbosity: 0,
            tie_epsilon_ms: 1e-9,
        }
    }
}

impl AnalysisConfig {
    /// Parse a config from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        Ok(serde_json::from_str(json)?)
    }
}
