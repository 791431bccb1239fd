//! Schema reconciler CLI for the telemetry store.
//!
//! Runs on every deployment: inspects the current partitioning of the
//! measurement store, plans the DDL needed to converge on the desired
//! scheme, applies it phase by phase, and attaches compression and
//! retention policies. Destructive convergence requires an explicit flag.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tl_common::{Error, OutputFormat, Result, RunId};
use tl_config::{desired, ConnectConfig, DesiredSchema};
use tl_schema::execute::{Executor, PgEngine};
use tl_schema::{catalog, plan, ExitCode, Report};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "tl-schema", version, about = "Reconcile the telemetry store schema")]
struct Cli {
    /// Database host.
    #[arg(long, env = "POSTGRES_HOST", default_value = "db")]
    host: String,

    /// Database port.
    #[arg(long, env = "POSTGRES_PORT", default_value_t = 5432)]
    port: u16,

    /// Database user.
    #[arg(long, env = "POSTGRES_USER", default_value = "postgres")]
    user: String,

    /// Database password.
    #[arg(long, env = "POSTGRES_PASSWORD", default_value = "postgres", hide_env_values = true)]
    password: String,

    /// Database name.
    #[arg(long, env = "POSTGRES_DB", default_value = "hvac")]
    database: String,

    /// Permit data-destroying convergence (drop and recreate).
    #[arg(
        long,
        env = "ALLOW_DESTRUCTIVE_INIT",
        default_value = "0",
        value_parser = parse_switch
    )]
    allow_destructive: bool,

    /// Compress chunks older than this many days.
    #[arg(long, env = "COMPRESS_AFTER_DAYS", default_value_t = desired::DEFAULT_COMPRESS_AFTER_DAYS)]
    compress_after_days: u32,

    /// Drop chunks older than this many days.
    #[arg(long, env = "RETAIN_DAYS", default_value_t = desired::DEFAULT_RETAIN_DAYS)]
    retain_days: u32,

    /// Measurement table name.
    #[arg(long, default_value = desired::DEFAULT_TABLE)]
    table: String,

    /// Time dimension column.
    #[arg(long, default_value = desired::DEFAULT_TIME_COLUMN)]
    time_column: String,

    /// Space dimension column.
    #[arg(long, default_value = desired::DEFAULT_SPACE_COLUMN)]
    space_column: String,

    /// Number of space partitions per time range.
    #[arg(long, default_value_t = desired::DEFAULT_NUM_PARTITIONS)]
    num_partitions: i32,

    /// Connection acquire timeout in seconds.
    #[arg(long, default_value_t = 30)]
    connect_timeout_secs: u64,

    /// Report output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    output: OutputFormat,
}

/// Parse an environment-style on/off switch ("1"/"0", "true"/"false").
fn parse_switch(s: &str) -> std::result::Result<bool, String> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(format!("expected an on/off switch, got {other:?}")),
    }
}

async fn run(cli: &Cli) -> Result<Report> {
    let connect = ConnectConfig {
        host: cli.host.clone(),
        port: cli.port,
        user: cli.user.clone(),
        password: cli.password.clone(),
        database: cli.database.clone(),
    };
    connect.validate()?;

    let desired = DesiredSchema {
        table: cli.table.clone(),
        time_column: cli.time_column.clone(),
        space_column: cli.space_column.clone(),
        num_partitions: cli.num_partitions,
        compress_after_days: cli.compress_after_days,
        retain_days: cli.retain_days,
        allow_destructive: cli.allow_destructive,
    };
    desired.validate()?;

    let run_id = RunId::new();
    tracing::info!(%run_id, store = %connect, table = %desired.table, "starting schema reconciliation");

    let pool = PgPoolOptions::new()
        .max_connections(2)
        .acquire_timeout(Duration::from_secs(cli.connect_timeout_secs))
        .connect(&connect.url())
        .await
        .map_err(|e| Error::Catalog(e.to_string()))?;

    let current = catalog::inspect(&pool, &desired.table).await?;
    tracing::debug!(exists = current.exists, dimensions = current.dimensions.len(), "inspected catalog");

    let plan = plan::plan(&current, &desired);
    if plan.diverged {
        tracing::warn!(
            table = %desired.table,
            "partitioning diverges from the desired scheme; destructive convergence not \
             authorized, leaving partitioning unchanged"
        );
    }

    let engine = PgEngine::new(pool.clone(), &desired.table);
    let executor = Executor::new(engine, run_id, &desired.table);
    let report = executor.execute(&plan).await?;

    pool.close().await;
    Ok(report)
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let output = cli.output;

    match run(&cli).await {
        Ok(report) => {
            match output {
                OutputFormat::Json => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(err) => {
                        tracing::error!("failed to serialize report: {err}");
                        std::process::exit(ExitCode::InternalError.as_i32());
                    }
                },
                OutputFormat::Text => println!("{}", report.completion_line()),
            }
            std::process::exit(ExitCode::Success.as_i32());
        }
        Err(err) => {
            tracing::error!(code = err.code(), "{err}");
            std::process::exit(ExitCode::from(&err).as_i32());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn switch_parsing_accepts_env_style_values() {
        assert_eq!(parse_switch("1"), Ok(true));
        assert_eq!(parse_switch("0"), Ok(false));
        assert_eq!(parse_switch("TRUE"), Ok(true));
        assert_eq!(parse_switch("off"), Ok(false));
        assert!(parse_switch("maybe").is_err());
    }

    #[test]
    fn defaults_match_deployment_contract() {
        let cli = Cli::parse_from(["tl-schema"]);
        assert_eq!(cli.host, "db");
        assert_eq!(cli.port, 5432);
        assert_eq!(cli.database, "hvac");
        assert!(!cli.allow_destructive);
        assert_eq!(cli.compress_after_days, 7);
        assert_eq!(cli.retain_days, 365);
        assert_eq!(cli.num_partitions, 8);
    }
}
