//! Rendering of abstract plan operations to PostgreSQL/TimescaleDB
//! statements. The single engine-specific layer: planner and executor stay
//! engine-agnostic and unit-testable without a live database.

use crate::entity;
use crate::plan::Operation;

/// Quote an SQL identifier, doubling embedded quotes.
pub fn quote_ident(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

/// Quote an SQL string literal, doubling embedded quotes.
pub fn quote_literal(text: &str) -> String {
    format!("'{}'", text.replace('\'', "''"))
}

/// Render one operation to its ordered list of SQL statements for `table`.
///
/// Statements carry their own `IF NOT EXISTS` / `IF EXISTS` guards wherever
/// the engine supports them, so re-running them against an already-converged
/// store is a no-op even when two runs race.
pub fn statements(op: &Operation, table: &str) -> Vec<String> {
    match op {
        Operation::EnsureExtension => {
            vec!["CREATE EXTENSION IF NOT EXISTS timescaledb".to_string()]
        }
        Operation::DropLegacyTables => entity::LEGACY_TABLES
            .iter()
            .map(|t| format!("DROP TABLE IF EXISTS {} CASCADE", quote_ident(t)))
            .collect(),
        Operation::CreateBaseTable => entity::CREATE_STATEMENTS
            .iter()
            .map(|s| s.to_string())
            .collect(),
        Operation::DropIncompatibleTable => {
            vec![format!(
                "DROP TABLE IF EXISTS {} CASCADE",
                quote_ident(table)
            )]
        }
        Operation::SetPrimaryKey { columns } => {
            let cols = columns
                .iter()
                .map(|c| quote_ident(c))
                .collect::<Vec<_>>()
                .join(", ");
            vec![
                format!(
                    "ALTER TABLE {} DROP CONSTRAINT IF EXISTS {}",
                    quote_ident(table),
                    quote_ident(&format!("{table}_pkey"))
                ),
                format!("ALTER TABLE {} ADD PRIMARY KEY ({})", quote_ident(table), cols),
            ]
        }
        Operation::EnablePartitioning {
            time_column,
            space_column,
            num_partitions,
        } => {
            vec![format!(
                "SELECT create_hypertable({}, {}, partitioning_column => {}, \
                 number_partitions => {}, if_not_exists => TRUE)",
                quote_literal(table),
                quote_literal(time_column),
                quote_literal(space_column),
                num_partitions
            )]
        }
        Operation::AddSpaceDimension {
            column,
            num_partitions,
        } => {
            vec![format!(
                "SELECT add_dimension({}, {}, number_partitions => {}, if_not_exists => TRUE)",
                quote_literal(table),
                quote_literal(column),
                num_partitions
            )]
        }
        Operation::ConfigureCompression {
            orderby_column,
            orderby_descending,
            segmentby_column,
        } => {
            let orderby = if *orderby_descending {
                format!("{orderby_column} DESC")
            } else {
                orderby_column.clone()
            };
            vec![format!(
                "ALTER TABLE {} SET (timescaledb.compress = true, \
                 timescaledb.compress_orderby = {}, timescaledb.compress_segmentby = {})",
                quote_ident(table),
                quote_literal(&orderby),
                quote_literal(segmentby_column)
            )]
        }
        Operation::AddCompressionPolicy { after_days } => {
            vec![format!(
                "SELECT add_compression_policy({}, INTERVAL '{} days', if_not_exists => TRUE)",
                quote_literal(table),
                after_days
            )]
        }
        Operation::AddRetentionPolicy { retain_days } => {
            vec![format!(
                "SELECT add_retention_policy({}, INTERVAL '{} days', if_not_exists => TRUE)",
                quote_literal(table),
                retain_days
            )]
        }
    }
}
