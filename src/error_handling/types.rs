//! Error type definitions.
//!
//! This module defines the errors raised at each layer: settings validation,
//! per-request validation, backend store operations and session startup.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),
}

/// Malformed or incomplete database settings.
///
/// Raised while validating the `mysql` / `postgres` sections. Always fatal to
/// session startup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("must have at least one of mysql or postgres configuration")]
    NoDatabase,

    #[error("settings must be a mapping with 'mysql' and/or 'postgres' keys")]
    NotAMapping,

    #[error("Key '{section}' error: Missing keys: {}", format_keys(.keys))]
    MissingKeys { section: String, keys: Vec<String> },

    #[error("Key '{section}' error: Wrong key '{key}'")]
    UnknownKey { section: String, key: String },

    #[error("Key '{section}' error: '{key}' should be instance of '{expected}'")]
    WrongType {
        section: String,
        key: String,
        expected: &'static str,
    },

    #[error("Key '{section}' error: '{key}' must be between {min} and {max}")]
    OutOfRange {
        section: String,
        key: String,
        min: i64,
        max: i64,
    },

    #[error("Key '{section}' error: min_connections ({min}) exceeds max_connections ({max})")]
    PoolBounds { section: String, min: u32, max: u32 },

    #[error("Key '{section}' error: Key 'model' error: Missing key: 'table_name'")]
    MissingTableName { section: String },

    #[error("Key '{section}' error: 'model' must declare at least one field besides 'table_name'")]
    EmptyModel { section: String },

    #[error("Key '{section}' error: '{field}' is reserved for the primary key")]
    ReservedField { section: String, field: String },

    #[error("Key '{section}' error: '{name}' is not a valid SQL identifier")]
    InvalidIdentifier { section: String, name: String },

    #[error("Key '{section}' error: field '{field}' has unknown type '{value}'")]
    UnknownFieldType {
        section: String,
        field: String,
        value: String,
    },

    #[error("Key '{section}' error: unknown ssl mode '{value}'")]
    UnknownSslMode { section: String, value: String },
}

fn format_keys(keys: &[String]) -> String {
    keys.iter()
        .map(|k| format!("'{k}'"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Which entry point rejected a callback result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Insert,
    Update,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestKind::Insert => "insert",
            RequestKind::Update => "update",
        }
    }
}

impl std::fmt::Display for RequestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A callback result that is structurally unusable.
///
/// Fatal to the single request it was raised for, never to the session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// An attribute has the wrong shape.
    #[error("{kind} process error: callback result's {field} should be {expected}")]
    WrongType {
        kind: RequestKind,
        field: &'static str,
        expected: &'static str,
    },

    /// `data` (or `query`) was an empty mapping.
    #[error("{kind} process error: {field} cannot be empty")]
    Empty {
        kind: RequestKind,
        field: &'static str,
    },

    /// A required attribute is absent from a loosely typed callback result.
    #[error("{kind} process error: callback result is missing '{field}'")]
    Missing {
        kind: RequestKind,
        field: &'static str,
    },

    /// The target selector names something other than mysql, postgres or both.
    #[error("{kind} process error: unknown target database '{value}'")]
    UnknownTarget { kind: RequestKind, value: String },

    /// The target selector resolved to a database this session never configured.
    #[error("{kind} process error: {database} is not configured for this session")]
    TargetNotConfigured {
        kind: RequestKind,
        database: &'static str,
    },

    /// A deduplication filter names a field the target table does not have.
    #[error("{kind} process error: filter field '{field}' is not a column of {database}")]
    UnknownFilterField {
        kind: RequestKind,
        database: &'static str,
        field: String,
    },

    /// The callback result is neither an insert nor an update.
    #[error("unknown callback result kind '{0}'")]
    UnknownKind(String),
}

/// Error types for backend store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQL execution or connection error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// A value in the payload cannot be bound to the column it targets.
    #[error("cannot bind value for column '{column}': {reason}")]
    Bind { column: String, reason: String },

    /// The payload or lookup names a field the record schema does not declare.
    #[error("unknown field '{field}' for table '{table}'")]
    UnknownField { table: String, field: String },

    /// An update was issued for a record that carries no primary key.
    #[error("record from table '{0}' has no primary key")]
    MissingPrimaryKey(String),

    /// The store is not reachable.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Errors that prevent a session from starting.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{database} startup error: {source}")]
    Store {
        database: &'static str,
        #[source]
        source: StoreError,
    },
}

/// Per-database actions taken by the reconciliation engine.
///
/// Used as keys for outcome statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ActionType {
    Created,
    Filtered,
    Updated,
    NotUpdated,
    NotCreated,
    Failed,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Created => "created",
            ActionType::Filtered => "filtered",
            ActionType::Updated => "updated",
            ActionType::NotUpdated => "not updated",
            ActionType::NotCreated => "not found, not created",
            ActionType::Failed => "failed",
        }
    }
}
