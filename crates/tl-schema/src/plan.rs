//! Reconciliation planning: pure decision logic from current state and
//! desired scheme to an ordered list of DDL operations.

use crate::catalog::HypertableState;
use serde::{Deserialize, Serialize};
use std::fmt;
use tl_config::DesiredSchema;

/// One abstract DDL operation. Rendering to engine statements lives in
/// [`crate::render`]; the planner stays engine-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Operation {
    /// Install the partitioning extension if missing.
    EnsureExtension,
    /// Drop unmanaged legacy tables left behind by earlier agents.
    DropLegacyTables,
    /// Create the full entity schema if missing.
    CreateBaseTable,
    /// Drop a measurement table whose partitioning cannot be converged
    /// in place. Destroys data; only planned when explicitly allowed.
    DropIncompatibleTable,
    /// Replace the primary key so it covers both partitioning columns.
    SetPrimaryKey { columns: Vec<String> },
    /// Register time + space partitioning on the measurement table.
    EnablePartitioning {
        time_column: String,
        space_column: String,
        num_partitions: i32,
    },
    /// Register the space dimension explicitly.
    AddSpaceDimension { column: String, num_partitions: i32 },
    /// Set the column-level compression layout. Overwrite-safe.
    ConfigureCompression {
        orderby_column: String,
        orderby_descending: bool,
        segmentby_column: String,
    },
    /// Register the background compression job. An already-registered job
    /// keeps its original interval; interval changes are not reconciled.
    AddCompressionPolicy { after_days: u32 },
    /// Register the background retention job. Same interval caveat as the
    /// compression policy.
    AddRetentionPolicy { retain_days: u32 },
}

impl Operation {
    /// Stable snake_case label used in logs, reports, and error messages.
    pub fn label(&self) -> &'static str {
        match self {
            Operation::EnsureExtension => "ensure_extension",
            Operation::DropLegacyTables => "drop_legacy_tables",
            Operation::CreateBaseTable => "create_base_table",
            Operation::DropIncompatibleTable => "drop_incompatible_table",
            Operation::SetPrimaryKey { .. } => "set_primary_key",
            Operation::EnablePartitioning { .. } => "enable_partitioning",
            Operation::AddSpaceDimension { .. } => "add_space_dimension",
            Operation::ConfigureCompression { .. } => "configure_compression",
            Operation::AddCompressionPolicy { .. } => "add_compression_policy",
            Operation::AddRetentionPolicy { .. } => "add_retention_policy",
        }
    }

    /// True for operations that can destroy data.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::DropLegacyTables | Operation::DropIncompatibleTable
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// An ordered reconciliation plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub operations: Vec<Operation>,
    /// Desired and current partitioning disagree but destructive
    /// convergence was not authorized. A warning, not a failure.
    pub diverged: bool,
}

impl Plan {
    /// Index of the first operation with the given label, if present.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.operations.iter().position(|op| op.label() == label)
    }

    /// Count of operations with the given label.
    pub fn count(&self, label: &str) -> usize {
        self.operations
            .iter()
            .filter(|op| op.label() == label)
            .count()
    }
}

/// Decide which operations converge `current` on `desired`.
///
/// Pure data-in/data-out; no store access. The resulting plan always starts
/// with the idempotent extension and base-table steps and always ends with
/// the compression/retention steps, which are independent of partition
/// topology. Partitioning-altering steps appear only when the table is
/// missing or when a mismatch may be corrected destructively.
pub fn plan(current: &HypertableState, desired: &DesiredSchema) -> Plan {
    let mut operations = vec![Operation::EnsureExtension];
    if desired.allow_destructive {
        operations.push(Operation::DropLegacyTables);
    }
    operations.push(Operation::CreateBaseTable);

    let mut diverged = false;
    if !current.exists {
        push_partitioning(&mut operations, desired);
    } else if partitioning_mismatch(current, desired) {
        if desired.allow_destructive {
            operations.push(Operation::DropIncompatibleTable);
            operations.push(Operation::CreateBaseTable);
            push_partitioning(&mut operations, desired);
        } else {
            diverged = true;
        }
    }

    operations.push(Operation::ConfigureCompression {
        orderby_column: desired.time_column.clone(),
        orderby_descending: true,
        segmentby_column: desired.space_column.clone(),
    });
    operations.push(Operation::AddCompressionPolicy {
        after_days: desired.compress_after_days,
    });
    operations.push(Operation::AddRetentionPolicy {
        retain_days: desired.retain_days,
    });

    Plan {
        operations,
        diverged,
    }
}

fn push_partitioning(operations: &mut Vec<Operation>, desired: &DesiredSchema) {
    operations.push(Operation::SetPrimaryKey {
        columns: vec![desired.time_column.clone(), desired.space_column.clone()],
    });
    operations.push(Operation::EnablePartitioning {
        time_column: desired.time_column.clone(),
        space_column: desired.space_column.clone(),
        num_partitions: desired.num_partitions,
    });
    operations.push(Operation::AddSpaceDimension {
        column: desired.space_column.clone(),
        num_partitions: desired.num_partitions,
    });
}

/// Case-sensitive exact column comparison, exact partition-count equality.
fn partitioning_mismatch(current: &HypertableState, desired: &DesiredSchema) -> bool {
    let time_ok = current
        .time_dimension()
        .is_some_and(|d| d.column_name == desired.time_column);
    let space_ok = current.space_dimension().is_some_and(|d| {
        d.column_name == desired.space_column && d.num_partitions == desired.num_partitions
    });
    !(time_ok && space_ok)
}
