//! Thermolio configuration types and validation.
//!
//! This crate provides:
//! - Typed connection settings for the telemetry store
//! - The desired partitioning scheme for the measurement hypertable
//! - Semantic validation, run before any catalog access

pub mod connect;
pub mod desired;

pub use connect::ConnectConfig;
pub use desired::DesiredSchema;
