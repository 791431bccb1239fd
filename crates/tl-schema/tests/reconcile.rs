//! End-to-end reconciliation properties over the static engine: idempotent
//! re-runs, destructive gating, and policy attachment independent of the
//! partitioning outcome.

use tl_common::RunId;
use tl_config::DesiredSchema;
use tl_schema::{
    plan, Dimension, DimensionKind, Executor, HypertableState, OperationStatus, StaticEngine,
};

fn desired(allow_destructive: bool) -> DesiredSchema {
    DesiredSchema {
        allow_destructive,
        ..DesiredSchema::default()
    }
}

fn managed(partitions: i32) -> HypertableState {
    HypertableState {
        exists: true,
        dimensions: vec![
            Dimension {
                kind: DimensionKind::Time,
                column_name: "measurement_timestamp".to_string(),
                num_partitions: 0,
            },
            Dimension {
                kind: DimensionKind::Space,
                column_name: "point_id".to_string(),
                num_partitions: partitions,
            },
        ],
    }
}

fn executor(engine: StaticEngine) -> Executor<StaticEngine> {
    Executor::new(engine, RunId::new(), "measurements")
}

#[tokio::test]
async fn second_run_is_a_complete_no_op() {
    let exec = executor(StaticEngine::new());

    // First deployment: nothing exists yet.
    let first = plan::plan(&HypertableState::unmanaged(), &desired(false));
    let report = exec.execute(&first).await.expect("first run");
    assert_eq!(report.summary.applied, first.operations.len());

    // Second deployment: the catalog now reports the converged scheme.
    let second = plan::plan(&managed(8), &desired(false));
    let report = exec.execute(&second).await.expect("second run");
    assert_eq!(report.summary.applied, 0);
    assert_eq!(report.summary.skipped, second.operations.len());
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.status == OperationStatus::Skipped));
}

#[tokio::test]
async fn unauthorized_divergence_warns_and_still_attaches_policies() {
    // Store converged on 4 space partitions, desired is 8.
    let exec = executor(StaticEngine::with_satisfied(&[
        "ensure_extension",
        "create_base_table",
        "set_primary_key",
        "enable_partitioning",
        "add_space_dimension",
    ]));

    let p = plan::plan(&managed(4), &desired(false));
    assert!(p.diverged);
    assert_eq!(p.count("drop_incompatible_table"), 0);
    assert_eq!(p.count("enable_partitioning"), 0);

    let report = exec.execute(&p).await.expect("diverged run succeeds");
    assert!(report.diverged);

    let applied = exec_applied(&exec);
    assert!(applied.contains(&"configure_compression"));
    assert!(applied.contains(&"add_compression_policy"));
    assert!(applied.contains(&"add_retention_policy"));
    assert!(!applied.contains(&"drop_incompatible_table"));
}

#[tokio::test]
async fn authorized_divergence_drops_once_and_recreates() {
    let exec = executor(StaticEngine::with_satisfied(&[
        "ensure_extension",
        "create_base_table",
        "set_primary_key",
        "enable_partitioning",
        "add_space_dimension",
        "configure_compression",
        "add_compression_policy",
        "add_retention_policy",
    ]));

    let p = plan::plan(&managed(4), &desired(true));
    assert!(!p.diverged);
    assert_eq!(p.count("drop_incompatible_table"), 1);

    let report = exec.execute(&p).await.expect("destructive run succeeds");
    assert!(!report.diverged);

    let applied = exec_applied(&exec);
    let drop_at = applied
        .iter()
        .position(|l| *l == "drop_incompatible_table")
        .expect("drop must run");
    for rebuilt in [
        "create_base_table",
        "set_primary_key",
        "enable_partitioning",
        "add_space_dimension",
    ] {
        let at = applied
            .iter()
            .position(|l| *l == rebuilt)
            .unwrap_or_else(|| panic!("{rebuilt} must be re-applied"));
        assert!(drop_at < at, "{rebuilt} must follow the drop");
    }

    // Converged now: a follow-up run plans no destructive work and skips all.
    let follow_up = plan::plan(&managed(8), &desired(true));
    assert_eq!(follow_up.count("drop_incompatible_table"), 0);
    let report = exec.execute(&follow_up).await.expect("follow-up run");
    assert_eq!(report.summary.applied, 0);
}

fn exec_applied(exec: &Executor<StaticEngine>) -> Vec<&'static str> {
    exec.engine().applied()
}
