//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (default ports, pool bounds, identifier rules)
//! - Record schema descriptors built from the `model` section
//! - Strict validation of the `mysql` / `postgres` settings mapping
//! - Settings file loading and CLI option types

mod constants;
mod file;
mod schema;
mod types;
mod validation;

// Re-export all constants
pub use constants::*;
pub use file::load_settings_file;
pub use schema::{FieldDef, FieldType, RecordSchema};
pub use types::{
    Config, DatabaseConfig, LogFormat, LogLevel, PoolConfig, SessionOptions, Settings, SslMode,
    TlsConfig,
};
pub use validation::{is_valid_identifier, validate_settings};
