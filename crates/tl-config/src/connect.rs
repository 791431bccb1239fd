//! Connection settings for the telemetry store.

use serde::{Deserialize, Serialize};
use std::fmt;
use tl_common::{Error, Result};

/// Connection settings for the PostgreSQL/TimescaleDB store.
///
/// Resolved once at process start (flags with environment fallbacks) and
/// passed by value into the pipeline; there is no ambient connection
/// singleton.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    #[serde(skip_serializing, default)]
    pub password: String,
    pub database: String,
}

impl ConnectConfig {
    /// Build the connection URL consumed by the database driver.
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }

    /// Validate the settings before attempting a connection.
    pub fn validate(&self) -> Result<()> {
        if self.host.is_empty() {
            return Err(Error::Config("database host must not be empty".to_string()));
        }
        if self.user.is_empty() {
            return Err(Error::Config("database user must not be empty".to_string()));
        }
        if self.database.is_empty() {
            return Err(Error::Config("database name must not be empty".to_string()));
        }
        Ok(())
    }
}

// Redacts the password; connection settings end up in logs and reports.
impl fmt::Display for ConnectConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "postgres://{}:***@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )
    }
}
