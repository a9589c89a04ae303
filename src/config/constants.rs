//! Configuration constants.

/// Settings section naming the MySQL-family store.
pub const MYSQL_SECTION: &str = "mysql";
/// Settings section naming the PostgreSQL-family store.
pub const POSTGRES_SECTION: &str = "postgres";

pub const DEFAULT_MYSQL_PORT: u16 = 3306;
pub const DEFAULT_POSTGRES_PORT: u16 = 5432;

// Pool bounds, only enforced when `pool = true`
pub const MIN_CONNECTIONS_RANGE: (i64, i64) = (1, 10);
pub const MAX_CONNECTIONS_RANGE: (i64, i64) = (10, 20);
pub const DEFAULT_MIN_CONNECTIONS: u32 = 1;
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Length of a `char` field declared without an explicit size.
pub const DEFAULT_CHAR_LENGTH: u16 = 255;

/// Implicit auto-increment primary key carried by every table.
pub const PRIMARY_KEY_COLUMN: &str = "id";

/// Keys of a database section that must always be present.
pub const REQUIRED_KEYS: &[&str] = &["database", "host", "model", "password", "user"];

/// Keys of a database section that may be present.
pub const OPTIONAL_KEYS: &[&str] = &["max_connections", "min_connections", "pool", "port", "ssl"];

/// SQL identifiers are interpolated into statements, so table and field names
/// are restricted to this pattern.
pub const IDENTIFIER_PATTERN: &str = r"^[A-Za-z_][A-Za-z0-9_]{0,63}$";

/// Upper bound on callback results processed concurrently by the batch runner.
pub const DEFAULT_MAX_CONCURRENCY: usize = 16;

/// How often the batch runner logs progress.
pub const LOGGING_INTERVAL: std::time::Duration = std::time::Duration::from_secs(5);
