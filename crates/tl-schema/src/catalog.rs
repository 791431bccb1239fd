//! Catalog inspection: current partitioning state of the measurement store.

use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tl_common::{Error, Result};

/// Partitioning axis kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DimensionKind {
    /// Range partitioning on a timestamp column.
    Time,
    /// Hash partitioning on a discrete column.
    Space,
}

impl DimensionKind {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Time" => Some(DimensionKind::Time),
            "Space" => Some(DimensionKind::Space),
            _ => None,
        }
    }
}

/// One partitioning dimension registered against the measurement table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimension {
    pub kind: DimensionKind,
    pub column_name: String,
    /// Meaningful only for space dimensions; 0 for time dimensions.
    pub num_partitions: i32,
}

/// Current partitioning state, read fresh from the engine catalog on every
/// run. Never cached: the physical catalog is the single source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HypertableState {
    pub exists: bool,
    pub dimensions: Vec<Dimension>,
}

impl HypertableState {
    /// State of a table that is not a managed hypertable (missing, or an
    /// ordinary table).
    pub fn unmanaged() -> Self {
        HypertableState {
            exists: false,
            dimensions: Vec::new(),
        }
    }

    /// The first registered time dimension, if any.
    pub fn time_dimension(&self) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.kind == DimensionKind::Time)
    }

    /// The first registered space dimension, if any.
    pub fn space_dimension(&self) -> Option<&Dimension> {
        self.dimensions
            .iter()
            .find(|d| d.kind == DimensionKind::Space)
    }
}

/// Inspect the engine catalog for dimensions registered against `table`.
///
/// Returns an unmanaged state when the table does not exist, is an ordinary
/// table, or the TimescaleDB extension itself is not installed yet — the
/// plan's own extension step must stay reachable on a fresh database. Fails
/// with a catalog error only when a metadata query itself fails. Never
/// mutates the store.
pub async fn inspect(pool: &PgPool, table: &str) -> Result<HypertableState> {
    let installed: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM pg_extension WHERE extname = 'timescaledb')",
    )
    .fetch_one(pool)
    .await
    .map_err(|e| Error::Catalog(e.to_string()))?;

    if !installed {
        tracing::debug!(table, "timescaledb extension not installed, treating as unmanaged");
        return Ok(HypertableState::unmanaged());
    }

    let rows: Vec<(String, String, i32)> = sqlx::query_as(
        "SELECT dimension_type, column_name, COALESCE(num_partitions, 0)::int \
         FROM timescaledb_information.dimensions \
         WHERE hypertable_name = $1 \
         ORDER BY dimension_number",
    )
    .bind(table)
    .fetch_all(pool)
    .await
    .map_err(|e| Error::Catalog(e.to_string()))?;

    let dimensions: Vec<Dimension> = rows
        .into_iter()
        .filter_map(|(kind, column_name, num_partitions)| {
            let kind = DimensionKind::parse(&kind)?;
            Some(Dimension {
                kind,
                column_name,
                num_partitions,
            })
        })
        .collect();

    Ok(HypertableState {
        exists: !dimensions.is_empty(),
        dimensions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dim(kind: DimensionKind, column: &str, partitions: i32) -> Dimension {
        Dimension {
            kind,
            column_name: column.to_string(),
            num_partitions: partitions,
        }
    }

    #[test]
    fn unmanaged_state_has_no_dimensions() {
        let state = HypertableState::unmanaged();
        assert!(!state.exists);
        assert!(state.time_dimension().is_none());
        assert!(state.space_dimension().is_none());
    }

    #[test]
    fn dimension_lookup_by_kind() {
        let state = HypertableState {
            exists: true,
            dimensions: vec![
                dim(DimensionKind::Time, "measurement_timestamp", 0),
                dim(DimensionKind::Space, "point_id", 8),
            ],
        };
        assert_eq!(
            state.time_dimension().unwrap().column_name,
            "measurement_timestamp"
        );
        assert_eq!(state.space_dimension().unwrap().num_partitions, 8);
    }

    #[test]
    fn unknown_dimension_type_is_ignored() {
        assert!(DimensionKind::parse("Closed").is_none());
        assert_eq!(DimensionKind::parse("Time"), Some(DimensionKind::Time));
        assert_eq!(DimensionKind::parse("Space"), Some(DimensionKind::Space));
        // case-sensitive, exact match
        assert!(DimensionKind::parse("time").is_none());
    }
}
