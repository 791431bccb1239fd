//! Exit codes for the tl-schema CLI.
//!
//! Exit codes communicate run outcome without requiring output parsing.
//! A detected-but-unauthorized partitioning divergence is a successful run
//! (with a warning), not a failure.

use tl_common::Error;

/// Exit codes for schema reconciliation runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Reconciliation completed (including diverged-with-warning runs).
    Success = 0,

    /// Configuration error.
    ConfigError = 10,

    /// Catalog metadata unavailable.
    CatalogError = 11,

    /// A DDL or policy operation failed.
    ExecutionError = 12,

    /// I/O error.
    IoError = 13,

    /// Internal/unknown error.
    InternalError = 99,
}

impl ExitCode {
    /// Convert to i32 for process exit.
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Check if this exit code indicates success.
    pub fn is_success(self) -> bool {
        matches!(self, ExitCode::Success)
    }

    /// Check if this exit code indicates an error requiring attention.
    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) => ExitCode::ConfigError,
            Error::Catalog(_) => ExitCode::CatalogError,
            Error::Execution { .. } => ExitCode::ExecutionError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }
}
