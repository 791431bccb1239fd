//! Structured reconciliation reports.

use serde::{Deserialize, Serialize};
use tl_common::RunId;

/// Current schema version for JSON report output.
pub const REPORT_SCHEMA_VERSION: &str = "1.0.0";

/// Outcome classification of a single operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// The operation performed work against the store.
    Applied,
    /// The store already satisfied the operation.
    Skipped,
}

/// Per-operation result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationOutcome {
    pub operation: String,
    pub status: OperationStatus,
}

/// Summary counts over all operation outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub attempted: usize,
    pub applied: usize,
    pub skipped: usize,
}

/// Full result of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub schema_version: String,
    pub run_id: RunId,
    pub table: String,
    /// Partitioning differed from the desired scheme and was left
    /// unchanged because destructive convergence was not authorized.
    pub diverged: bool,
    pub summary: Summary,
    pub outcomes: Vec<OperationOutcome>,
    pub finished_at: chrono::DateTime<chrono::Utc>,
}

impl Report {
    pub fn new(
        run_id: RunId,
        table: impl Into<String>,
        diverged: bool,
        outcomes: Vec<OperationOutcome>,
    ) -> Self {
        let applied = outcomes
            .iter()
            .filter(|o| o.status == OperationStatus::Applied)
            .count();
        let summary = Summary {
            attempted: outcomes.len(),
            applied,
            skipped: outcomes.len() - applied,
        };
        Report {
            schema_version: REPORT_SCHEMA_VERSION.to_string(),
            run_id,
            table: table.into(),
            diverged,
            summary,
            outcomes,
            finished_at: chrono::Utc::now(),
        }
    }

    /// Single human-readable line for operational logs.
    pub fn completion_line(&self) -> String {
        if self.diverged {
            format!(
                "Schema reconciled with warnings; '{}' partitioning diverges from the desired \
                 scheme and was left unchanged; compression and retention applied \
                 ({} applied, {} skipped).",
                self.table, self.summary.applied, self.summary.skipped
            )
        } else {
            format!(
                "Schema reconciled; '{}' partitioning, compression, and retention applied \
                 ({} applied, {} skipped).",
                self.table, self.summary.applied, self.summary.skipped
            )
        }
    }
}
