//! Configuration types and CLI options.
//!
//! This module defines the normalized per-database configuration produced by
//! settings validation, the engine options, and the command-line options of the
//! batch runner.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::config::constants::DEFAULT_MAX_CONCURRENCY;
use crate::config::schema::RecordSchema;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// TLS negotiation policy for a database connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SslMode {
    Disabled,
    Preferred,
    Required,
    VerifyCa,
    VerifyIdentity,
}

/// TLS settings from the `ssl` key of a database section.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TlsConfig {
    pub mode: SslMode,
    /// PEM bundle used to verify the server certificate.
    pub ca: Option<PathBuf>,
}

/// Connection pool bounds.
///
/// When pooling is not requested the handle is opened with a single
/// connection and the bounds are both 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolConfig {
    pub pooled: bool,
    pub min_connections: u32,
    pub max_connections: u32,
}

impl PoolConfig {
    pub fn single() -> Self {
        PoolConfig {
            pooled: false,
            min_connections: 1,
            max_connections: 1,
        }
    }
}

/// Normalized settings for one backing store.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
    pub pool: PoolConfig,
    pub tls: Option<TlsConfig>,
    pub schema: RecordSchema,
}

/// Validated settings: zero, one or two database configurations, at least one
/// of which is present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub mysql: Option<DatabaseConfig>,
    pub postgres: Option<DatabaseConfig>,
}

/// Engine behavior knobs that are not part of the database settings.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// When true, values created through a filtered insert are added to the
    /// in-memory deduplication cache so later requests in the same session
    /// see them. When false (the default) only the snapshot taken on first
    /// use is consulted.
    pub track_inserted_filters: bool,
}

/// Command-line options of the batch runner.
///
/// # Examples
///
/// ```no_run
/// use crawl_sink::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     settings: PathBuf::from("sink.toml"),
///     input: PathBuf::from("items.jsonl"),
///     ..Default::default()
/// };
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "crawl_sink",
    version,
    about = "Persist crawler callback results into MySQL and/or PostgreSQL"
)]
pub struct Config {
    /// Database settings file (TOML or JSON)
    #[arg(short, long, env = "CRAWL_SINK_SETTINGS", default_value = "crawl_sink.toml")]
    pub settings: PathBuf,

    /// JSON-lines file of callback results, or '-' for stdin
    #[arg(default_value = "-")]
    pub input: PathBuf,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,

    /// Log format
    #[arg(long, value_enum, default_value = "plain")]
    pub log_format: LogFormat,

    /// Maximum callback results processed concurrently
    #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENCY)]
    pub max_concurrency: usize,

    /// Add values created by filtered inserts to the deduplication cache
    #[arg(long)]
    pub track_inserted_filters: bool,

    /// Validate settings and process input against in-memory stores only
    #[arg(long)]
    pub dry_run: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            settings: PathBuf::from("crawl_sink.toml"),
            input: PathBuf::from("-"),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            track_inserted_filters: false,
            dry_run: false,
        }
    }
}

impl Config {
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            track_inserted_filters: self.track_inserted_filters,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(
            log::LevelFilter::from(LogLevel::Error),
            log::LevelFilter::Error
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Warn),
            log::LevelFilter::Warn
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Info),
            log::LevelFilter::Info
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Debug),
            log::LevelFilter::Debug
        );
        assert_eq!(
            log::LevelFilter::from(LogLevel::Trace),
            log::LevelFilter::Trace
        );
    }

    #[test]
    fn test_cli_defaults_match_default_impl() {
        let parsed = Config::parse_from(["crawl_sink"]);
        let default = Config::default();
        assert_eq!(parsed.input, default.input);
        assert_eq!(parsed.max_concurrency, default.max_concurrency);
        assert!(!parsed.dry_run);
        assert!(!parsed.track_inserted_filters);
    }

    #[test]
    fn test_cli_flags() {
        let parsed = Config::parse_from([
            "crawl_sink",
            "--settings",
            "db.json",
            "--dry-run",
            "--track-inserted-filters",
            "--max-concurrency",
            "4",
            "items.jsonl",
        ]);
        assert_eq!(parsed.settings, PathBuf::from("db.json"));
        assert_eq!(parsed.input, PathBuf::from("items.jsonl"));
        assert_eq!(parsed.max_concurrency, 4);
        assert!(parsed.dry_run);
        assert!(parsed.session_options().track_inserted_filters);
    }

    #[test]
    fn test_single_pool_bounds() {
        let pool = PoolConfig::single();
        assert!(!pool.pooled);
        assert_eq!(pool.min_connections, 1);
        assert_eq!(pool.max_connections, 1);
    }
}
