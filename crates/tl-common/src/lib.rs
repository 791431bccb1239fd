//! Thermolio common types, IDs, and errors.
//!
//! This crate provides foundational types shared across the schema tooling:
//! - Unified error type with stable codes
//! - Run identifiers for reconciliation runs
//! - Output format specification for CLI tools

pub mod error;
pub mod id;
pub mod output;

pub use error::{Error, Result};
pub use id::RunId;
pub use output::OutputFormat;
