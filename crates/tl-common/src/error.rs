//! Error types for the Thermolio schema tooling.

use thiserror::Error;

/// Result type alias for schema tooling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for the schema tooling.
///
/// Divergence between desired and current partitioning is deliberately not
/// represented here: it is a planning outcome, surfaced as a flag on the
/// plan and reported as a warning, never as an error.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-19)
    #[error("configuration error: {0}")]
    Config(String),

    // Catalog errors (20-29)
    #[error("catalog unavailable: {0}")]
    Catalog(String),

    // Execution errors (30-39)
    #[error("operation {operation} failed: {cause}")]
    Execution { operation: String, cause: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Returns the stable error code for this error type.
    /// Used for detailed error reporting in JSON output.
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::Catalog(_) => 20,
            Error::Execution { .. } => 30,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_error_names_the_operation() {
        let err = Error::Execution {
            operation: "enable_partitioning".to_string(),
            cause: "permission denied".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("enable_partitioning"));
        assert!(msg.contains("permission denied"));
    }

    #[test]
    fn codes_are_grouped_by_kind() {
        assert_eq!(Error::Config("x".into()).code(), 10);
        assert_eq!(Error::Catalog("x".into()).code(), 20);
        assert_eq!(
            Error::Execution {
                operation: "op".into(),
                cause: "c".into()
            }
            .code(),
            30
        );
    }
}
