//! Desired partitioning scheme for the measurement hypertable.

use serde::{Deserialize, Serialize};
use tl_common::{Error, Result};

/// Default measurement table name.
pub const DEFAULT_TABLE: &str = "measurements";
/// Default time dimension column.
pub const DEFAULT_TIME_COLUMN: &str = "measurement_timestamp";
/// Default space dimension column.
pub const DEFAULT_SPACE_COLUMN: &str = "point_id";
/// Default space partition count.
pub const DEFAULT_NUM_PARTITIONS: i32 = 8;
/// Default compression horizon in days.
pub const DEFAULT_COMPRESS_AFTER_DAYS: u32 = 7;
/// Default retention horizon in days.
pub const DEFAULT_RETAIN_DAYS: u32 = 365;

/// The partitioning scheme and policy horizons a run should converge on.
///
/// Immutable per run; supplied by the caller, never persisted. The physical
/// catalog is the single source of truth for the current state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesiredSchema {
    /// Measurement table name.
    pub table: String,
    /// Time dimension column (range partitioned).
    pub time_column: String,
    /// Space dimension column (hash partitioned).
    pub space_column: String,
    /// Number of space partitions per time range.
    pub num_partitions: i32,
    /// Compress chunks older than this many days.
    pub compress_after_days: u32,
    /// Drop chunks older than this many days.
    pub retain_days: u32,
    /// Permit data-destroying operations (table drop and recreate).
    pub allow_destructive: bool,
}

impl Default for DesiredSchema {
    fn default() -> Self {
        DesiredSchema {
            table: DEFAULT_TABLE.to_string(),
            time_column: DEFAULT_TIME_COLUMN.to_string(),
            space_column: DEFAULT_SPACE_COLUMN.to_string(),
            num_partitions: DEFAULT_NUM_PARTITIONS,
            compress_after_days: DEFAULT_COMPRESS_AFTER_DAYS,
            retain_days: DEFAULT_RETAIN_DAYS,
            allow_destructive: false,
        }
    }
}

impl DesiredSchema {
    /// Semantic validation, run before any catalog access.
    pub fn validate(&self) -> Result<()> {
        if self.table.is_empty() {
            return Err(Error::Config("table name must not be empty".to_string()));
        }
        if self.time_column.is_empty() || self.space_column.is_empty() {
            return Err(Error::Config(
                "dimension column names must not be empty".to_string(),
            ));
        }
        if self.time_column == self.space_column {
            return Err(Error::Config(format!(
                "time and space dimensions must use distinct columns, both are {}",
                self.time_column
            )));
        }
        if self.num_partitions <= 0 {
            return Err(Error::Config(format!(
                "number of space partitions must be positive, got {}",
                self.num_partitions
            )));
        }
        if self.compress_after_days == 0 {
            return Err(Error::Config(
                "compression horizon must be at least one day".to_string(),
            ));
        }
        if self.retain_days == 0 {
            return Err(Error::Config(
                "retention horizon must be at least one day".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(DesiredSchema::default().validate().is_ok());
    }

    #[test]
    fn defaults_match_deployment_contract() {
        let d = DesiredSchema::default();
        assert_eq!(d.table, "measurements");
        assert_eq!(d.time_column, "measurement_timestamp");
        assert_eq!(d.space_column, "point_id");
        assert_eq!(d.num_partitions, 8);
        assert_eq!(d.compress_after_days, 7);
        assert_eq!(d.retain_days, 365);
        assert!(!d.allow_destructive);
    }

    #[test]
    fn non_positive_partition_count_is_rejected() {
        let mut d = DesiredSchema::default();
        d.num_partitions = 0;
        assert!(d.validate().is_err());
        d.num_partitions = -4;
        assert!(d.validate().is_err());
    }

    #[test]
    fn identical_dimension_columns_are_rejected() {
        let mut d = DesiredSchema::default();
        d.space_column = d.time_column.clone();
        assert!(d.validate().is_err());
    }

    #[test]
    fn zero_horizons_are_rejected() {
        let mut d = DesiredSchema::default();
        d.compress_after_days = 0;
        assert!(d.validate().is_err());

        let mut d = DesiredSchema::default();
        d.retain_days = 0;
        assert!(d.validate().is_err());
    }
}
