//! Measurement-store schema reconciler.
//!
//! Converges the physical partitioning of the telemetry store on a desired
//! scheme in one linear pass: inspect the catalog, plan the required DDL,
//! execute it phase by phase, attach compression and retention policies.
//! Every step is idempotent, so the reconciler runs on every deployment;
//! data-destroying convergence is gated behind an explicit operator flag.

pub mod catalog;
pub mod entity;
pub mod execute;
pub mod exit_codes;
pub mod plan;
pub mod render;
pub mod report;

pub use catalog::{inspect, Dimension, DimensionKind, HypertableState};
pub use execute::{Engine, Executor, PgEngine, Phase, StaticEngine};
pub use exit_codes::ExitCode;
pub use plan::{plan, Operation, Plan};
pub use report::{OperationOutcome, OperationStatus, Report, Summary};
