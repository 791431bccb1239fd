//! Phased plan execution against the store.
//!
//! Operations run strictly in plan order, grouped into phases that each
//! commit as one transaction: the engine requires the primary key to be
//! committed before partitioning functions are invoked. Within a phase the
//! engine classifies each operation as applied or already-satisfied by
//! probing the catalog inside the transaction, so earlier uncommitted work
//! (a drop before a re-create) is visible to later probes. The rendered DDL
//! keeps its own existence guards regardless.

use crate::entity;
use crate::plan::{Operation, Plan};
use crate::render;
use crate::report::{OperationOutcome, OperationStatus, Report};
use sqlx::{PgPool, Postgres, Transaction};
use tl_common::{Error, Result, RunId};

/// Execution phase; each phase is one transactional unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Extension, legacy cleanup, base tables, incompatible drop/recreate.
    Schema,
    /// Primary-key swap, committed before partitioning is registered.
    Keys,
    /// Hypertable and space dimension registration.
    Partitioning,
    /// Compression layout and background policies.
    Policies,
}

impl Phase {
    /// The phase an operation belongs to.
    pub fn of(op: &Operation) -> Phase {
        match op {
            Operation::EnsureExtension
            | Operation::DropLegacyTables
            | Operation::CreateBaseTable
            | Operation::DropIncompatibleTable => Phase::Schema,
            Operation::SetPrimaryKey { .. } => Phase::Keys,
            Operation::EnablePartitioning { .. } | Operation::AddSpaceDimension { .. } => {
                Phase::Partitioning
            }
            Operation::ConfigureCompression { .. }
            | Operation::AddCompressionPolicy { .. }
            | Operation::AddRetentionPolicy { .. } => Phase::Policies,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Phase::Schema => "schema",
            Phase::Keys => "keys",
            Phase::Partitioning => "partitioning",
            Phase::Policies => "policies",
        }
    }
}

/// Group a plan's operations into consecutive phase runs, preserving order.
fn phases(plan: &Plan) -> Vec<(Phase, Vec<Operation>)> {
    let mut groups: Vec<(Phase, Vec<Operation>)> = Vec::new();
    for op in &plan.operations {
        let phase = Phase::of(op);
        match groups.last_mut() {
            Some((current, ops)) if *current == phase => ops.push(op.clone()),
            _ => groups.push((phase, vec![op.clone()])),
        }
    }
    groups
}

/// Trait for running one phase of a plan as a single unit of work.
///
/// Implementations return one status per operation, in order, and abort the
/// whole phase (rolling back its work) on the first engine-level failure.
#[allow(async_fn_in_trait)]
pub trait Engine {
    async fn run_phase(&self, phase: Phase, ops: &[Operation]) -> Result<Vec<OperationStatus>>;
}

/// Plan executor: drives an engine phase by phase and assembles the report.
pub struct Executor<E> {
    engine: E,
    run_id: RunId,
    table: String,
}

impl<E: Engine> Executor<E> {
    pub fn new(engine: E, run_id: RunId, table: impl Into<String>) -> Self {
        Executor {
            engine,
            run_id,
            table: table.into(),
        }
    }

    /// The underlying engine.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Apply the plan in order. Aborts on the first failing operation;
    /// phases already committed stay applied and re-converge on the next
    /// run.
    pub async fn execute(&self, plan: &Plan) -> Result<Report> {
        let mut outcomes = Vec::with_capacity(plan.operations.len());
        for (phase, ops) in phases(plan) {
            tracing::info!(phase = phase.name(), operations = ops.len(), "running phase");
            let statuses = self.engine.run_phase(phase, &ops).await?;
            for (op, status) in ops.iter().zip(statuses) {
                tracing::debug!(operation = op.label(), ?status, "operation finished");
                outcomes.push(OperationOutcome {
                    operation: op.label().to_string(),
                    status,
                });
            }
        }
        Ok(Report::new(
            self.run_id.clone(),
            self.table.clone(),
            plan.diverged,
            outcomes,
        ))
    }
}

// ── PostgreSQL/TimescaleDB engine ───────────────────────────────────────

/// Engine backed by a PostgreSQL/TimescaleDB connection pool.
pub struct PgEngine {
    pool: PgPool,
    table: String,
}

/// Primary-key column list for a table, in key order.
const PK_COLUMNS_SQL: &str = "\
SELECT array_agg(a.attname::text ORDER BY k.ordinality) \
  FROM pg_constraint c \
  JOIN pg_class t ON t.oid = c.conrelid \
  JOIN unnest(c.conkey) WITH ORDINALITY AS k(attnum, ordinality) ON true \
  JOIN pg_attribute a ON a.attrelid = t.oid AND a.attnum = k.attnum \
 WHERE t.relname = $1 AND c.contype = 'p' \
 GROUP BY c.conname";

impl PgEngine {
    pub fn new(pool: PgPool, table: impl Into<String>) -> Self {
        PgEngine {
            pool,
            table: table.into(),
        }
    }

    async fn table_present(
        tx: &mut Transaction<'_, Postgres>,
        table: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar("SELECT to_regclass($1) IS NOT NULL")
            .bind(table)
            .fetch_one(&mut **tx)
            .await
    }

    /// Whether the store already satisfies `op`. Runs inside the phase
    /// transaction so earlier statements of the same phase are visible.
    async fn satisfied(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        op: &Operation,
    ) -> sqlx::Result<bool> {
        match op {
            Operation::EnsureExtension => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'timescaledb')",
                )
                .fetch_one(&mut **tx)
                .await
            }
            Operation::DropLegacyTables => {
                for legacy in entity::LEGACY_TABLES {
                    if Self::table_present(tx, legacy).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operation::CreateBaseTable => {
                for table in entity::TABLE_NAMES {
                    if !Self::table_present(tx, table).await? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Operation::DropIncompatibleTable => {
                Ok(!Self::table_present(tx, &self.table).await?)
            }
            Operation::SetPrimaryKey { columns } => {
                let current: Option<Vec<String>> = sqlx::query_scalar(PK_COLUMNS_SQL)
                    .bind(&self.table)
                    .fetch_optional(&mut **tx)
                    .await?;
                Ok(current.as_deref() == Some(columns.as_slice()))
            }
            Operation::EnablePartitioning { .. } => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM timescaledb_information.hypertables \
                     WHERE hypertable_name = $1)",
                )
                .bind(&self.table)
                .fetch_one(&mut **tx)
                .await
            }
            Operation::AddSpaceDimension {
                column,
                num_partitions,
            } => {
                sqlx::query_scalar(
                    "SELECT EXISTS (SELECT 1 FROM timescaledb_information.dimensions \
                     WHERE hypertable_name = $1 AND dimension_type = 'Space' \
                       AND column_name = $2 AND num_partitions = $3)",
                )
                .bind(&self.table)
                .bind(column)
                .bind(num_partitions)
                .fetch_one(&mut **tx)
                .await
            }
            Operation::ConfigureCompression { .. } => {
                let enabled: Option<bool> = sqlx::query_scalar(
                    "SELECT compression_enabled FROM timescaledb_information.hypertables \
                     WHERE hypertable_name = $1",
                )
                .bind(&self.table)
                .fetch_optional(&mut **tx)
                .await?;
                Ok(enabled.unwrap_or(false))
            }
            Operation::AddCompressionPolicy { .. } => {
                self.policy_registered(tx, "policy_compression").await
            }
            Operation::AddRetentionPolicy { .. } => {
                self.policy_registered(tx, "policy_retention").await
            }
        }
    }

    async fn policy_registered(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        proc_name: &str,
    ) -> sqlx::Result<bool> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM timescaledb_information.jobs \
             WHERE proc_name = $1 AND hypertable_name = $2)",
        )
        .bind(proc_name)
        .bind(&self.table)
        .fetch_one(&mut **tx)
        .await
    }
}

fn exec_err(op: &Operation, cause: sqlx::Error) -> Error {
    Error::Execution {
        operation: op.label().to_string(),
        cause: cause.to_string(),
    }
}

impl Engine for PgEngine {
    async fn run_phase(&self, phase: Phase, ops: &[Operation]) -> Result<Vec<OperationStatus>> {
        let mut tx = self.pool.begin().await.map_err(|e| Error::Execution {
            operation: phase.name().to_string(),
            cause: e.to_string(),
        })?;

        let mut statuses = Vec::with_capacity(ops.len());
        for op in ops {
            if self.satisfied(&mut tx, op).await.map_err(|e| exec_err(op, e))? {
                tracing::debug!(operation = op.label(), "already satisfied");
                statuses.push(OperationStatus::Skipped);
                continue;
            }
            for sql in render::statements(op, &self.table) {
                let preview: String = sql.chars().take(80).collect();
                tracing::debug!(operation = op.label(), "executing: {preview}");
                sqlx::query(&sql)
                    .execute(&mut *tx)
                    .await
                    .map_err(|e| exec_err(op, e))?;
            }
            statuses.push(OperationStatus::Applied);
        }

        tx.commit().await.map_err(|e| Error::Execution {
            operation: phase.name().to_string(),
            cause: e.to_string(),
        })?;
        Ok(statuses)
    }
}

// ── Static engine (tests and scaffolding) ───────────────────────────────

use std::collections::HashSet;
use std::sync::Mutex;

/// In-memory engine that models satisfied-state transitions without a
/// store. Used for executor tests and pipeline scaffolding.
#[derive(Debug, Default)]
pub struct StaticEngine {
    state: Mutex<HashSet<&'static str>>,
    fail_on: Option<&'static str>,
    log: Mutex<Vec<&'static str>>,
}

impl StaticEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine whose store already satisfies the given operation labels.
    pub fn with_satisfied(labels: &[&'static str]) -> Self {
        StaticEngine {
            state: Mutex::new(labels.iter().copied().collect()),
            ..Self::default()
        }
    }

    /// Engine that fails when the labelled operation is applied.
    pub fn failing_on(mut self, label: &'static str) -> Self {
        self.fail_on = Some(label);
        self
    }

    /// Labels of operations applied so far, in order.
    pub fn applied(&self) -> Vec<&'static str> {
        self.log.lock().expect("lock").clone()
    }

    fn is_satisfied(state: &HashSet<&'static str>, op: &Operation) -> bool {
        match op {
            // Nothing to drop once the measurement table is absent.
            Operation::DropIncompatibleTable => !state.contains("create_base_table"),
            _ => state.contains(op.label()),
        }
    }

    fn apply(state: &mut HashSet<&'static str>, op: &Operation) {
        match op {
            // Dropping the table unregisters everything hanging off it.
            Operation::DropIncompatibleTable => {
                for gone in [
                    "create_base_table",
                    "set_primary_key",
                    "enable_partitioning",
                    "add_space_dimension",
                    "configure_compression",
                    "add_compression_policy",
                    "add_retention_policy",
                ] {
                    state.remove(gone);
                }
            }
            _ => {
                state.insert(op.label());
            }
        }
    }
}

impl Engine for StaticEngine {
    async fn run_phase(&self, _phase: Phase, ops: &[Operation]) -> Result<Vec<OperationStatus>> {
        // Work on a scratch copy; commit only if the whole phase succeeds.
        let mut scratch = self.state.lock().expect("lock").clone();
        let mut applied_now = Vec::new();
        let mut statuses = Vec::with_capacity(ops.len());

        for op in ops {
            if Self::is_satisfied(&scratch, op) {
                statuses.push(OperationStatus::Skipped);
                continue;
            }
            if self.fail_on == Some(op.label()) {
                return Err(Error::Execution {
                    operation: op.label().to_string(),
                    cause: "injected failure".to_string(),
                });
            }
            Self::apply(&mut scratch, op);
            applied_now.push(op.label());
            statuses.push(OperationStatus::Applied);
        }

        *self.state.lock().expect("lock") = scratch;
        self.log.lock().expect("lock").extend(applied_now);
        Ok(statuses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::HypertableState;
    use crate::plan::plan;
    use tl_config::DesiredSchema;

    fn desired(allow_destructive: bool) -> DesiredSchema {
        DesiredSchema {
            allow_destructive,
            ..DesiredSchema::default()
        }
    }

    fn executor(engine: StaticEngine) -> Executor<StaticEngine> {
        Executor::new(engine, RunId::new(), "measurements")
    }

    // ── Phase grouping ──────────────────────────────────────────────

    #[test]
    fn phases_group_in_pipeline_order() {
        let p = plan(&HypertableState::unmanaged(), &desired(false));
        let groups = phases(&p);
        let order: Vec<Phase> = groups.iter().map(|(phase, _)| *phase).collect();
        assert_eq!(
            order,
            vec![Phase::Schema, Phase::Keys, Phase::Partitioning, Phase::Policies]
        );
        let total: usize = groups.iter().map(|(_, ops)| ops.len()).sum();
        assert_eq!(total, p.operations.len());
    }

    #[test]
    fn diverged_plan_has_no_keys_or_partitioning_phase() {
        let current = HypertableState {
            exists: true,
            dimensions: vec![],
        };
        // exists with no dimensions mismatches, and destructive is off
        let p = plan(&current, &desired(false));
        assert!(p.diverged);
        let order: Vec<Phase> = phases(&p).iter().map(|(phase, _)| *phase).collect();
        assert_eq!(order, vec![Phase::Schema, Phase::Policies]);
    }

    // ── Executor over the static engine ─────────────────────────────

    #[tokio::test]
    async fn fresh_run_applies_every_operation() {
        let p = plan(&HypertableState::unmanaged(), &desired(false));
        let report = executor(StaticEngine::new()).execute(&p).await.unwrap();
        assert_eq!(report.summary.attempted, p.operations.len());
        assert_eq!(report.summary.applied, p.operations.len());
        assert_eq!(report.summary.skipped, 0);
        assert!(!report.diverged);
    }

    #[tokio::test]
    async fn rerun_against_satisfied_store_skips_everything() {
        let exec = executor(StaticEngine::new());
        let p = plan(&HypertableState::unmanaged(), &desired(false));
        exec.execute(&p).await.unwrap();

        let report = exec.execute(&p).await.unwrap();
        assert_eq!(report.summary.applied, 0);
        assert_eq!(report.summary.skipped, p.operations.len());
    }

    #[tokio::test]
    async fn destructive_recreate_reapplies_after_drop() {
        // Store previously converged on a different scheme.
        let engine = StaticEngine::with_satisfied(&[
            "ensure_extension",
            "create_base_table",
            "set_primary_key",
            "enable_partitioning",
            "add_space_dimension",
            "configure_compression",
            "add_compression_policy",
            "add_retention_policy",
        ]);
        let current = HypertableState {
            exists: true,
            dimensions: vec![],
        };
        let p = plan(&current, &desired(true));
        let exec = executor(engine);
        let report = exec.execute(&p).await.unwrap();

        let applied = exec.engine.applied();
        // The drop ran, and the base table was re-created after it.
        let drop_at = applied
            .iter()
            .position(|l| *l == "drop_incompatible_table")
            .unwrap();
        let recreate_at = applied
            .iter()
            .position(|l| *l == "create_base_table")
            .unwrap();
        assert!(drop_at < recreate_at);
        assert!(!report.diverged);
    }

    #[tokio::test]
    async fn failure_aborts_and_preserves_committed_phases() {
        let engine = StaticEngine::new().failing_on("enable_partitioning");
        let p = plan(&HypertableState::unmanaged(), &desired(false));
        let exec = executor(engine);
        let err = exec.execute(&p).await.unwrap_err();
        match err {
            Error::Execution { operation, .. } => assert_eq!(operation, "enable_partitioning"),
            other => panic!("unexpected error: {other}"),
        }

        let applied = exec.engine.applied();
        // Earlier phases committed; the failing phase rolled back wholesale.
        assert!(applied.contains(&"ensure_extension"));
        assert!(applied.contains(&"create_base_table"));
        assert!(applied.contains(&"set_primary_key"));
        assert!(!applied.contains(&"enable_partitioning"));
        assert!(!applied.contains(&"add_space_dimension"));
        assert!(!applied.contains(&"add_compression_policy"));
    }

    #[tokio::test]
    async fn diverged_run_still_applies_policies() {
        let engine = StaticEngine::with_satisfied(&["ensure_extension", "create_base_table"]);
        let current = HypertableState {
            exists: true,
            dimensions: vec![],
        };
        let p = plan(&current, &desired(false));
        let exec = executor(engine);
        let report = exec.execute(&p).await.unwrap();
        assert!(report.diverged);

        let applied = exec.engine.applied();
        assert!(applied.contains(&"configure_compression"));
        assert!(applied.contains(&"add_compression_policy"));
        assert!(applied.contains(&"add_retention_policy"));
        assert!(!applied.contains(&"enable_partitioning"));
    }
}
