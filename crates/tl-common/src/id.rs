//! Reconciliation run identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier for a single reconciliation run.
///
/// Format: `run-<date>-<time>-<random>`
/// Example: `run-20260806-143022-ab12cd`
///
/// Every invocation gets a fresh id; it ties log lines and the final report
/// to one run when several deployments race against the same store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    /// Generate a new run id.
    pub fn new() -> Self {
        let now = chrono::Utc::now();
        let random: String = uuid::Uuid::new_v4().to_string().chars().take(6).collect();
        RunId(format!("run-{}-{}", now.format("%Y%m%d-%H%M%S"), random))
    }

    /// Parse an existing run id string.
    pub fn parse(s: &str) -> Option<Self> {
        if s.starts_with("run-") && s.len() > 20 {
            Some(RunId(s.to_string()))
        } else {
            None
        }
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
