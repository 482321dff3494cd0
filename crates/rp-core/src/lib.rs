//! # rp-core
//!
//! Foundations shared by the reactive-predicates crates.
//!
//! - `config` - Application, database and logging configuration
//! - `error` - Configuration errors and the validation error collection
//! - `telemetry` - Tracing subscriber setup for binaries

pub mod config;
pub mod error;
pub mod telemetry;

pub use config::{AppConfig, DatabaseConfig, LogFormat, LoggingConfig};
pub use error::{ConfigError, ValidationErrors};
