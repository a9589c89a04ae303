//! Database connection pool management.
//!
//! Opens a sqlx pool per configured store. When pooling is not requested the
//! pool is capped at a single connection; otherwise the configured
//! `min_connections`/`max_connections` bounds apply. TLS settings map onto the
//! driver's SSL modes.

use log::{error, info};
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlSslMode};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};

use crate::config::{DatabaseConfig, SslMode};
use crate::error_handling::StoreError;

fn mysql_ssl_mode(mode: SslMode) -> MySqlSslMode {
    match mode {
        SslMode::Disabled => MySqlSslMode::Disabled,
        SslMode::Preferred => MySqlSslMode::Preferred,
        SslMode::Required => MySqlSslMode::Required,
        SslMode::VerifyCa => MySqlSslMode::VerifyCa,
        SslMode::VerifyIdentity => MySqlSslMode::VerifyIdentity,
    }
}

fn pg_ssl_mode(mode: SslMode) -> PgSslMode {
    match mode {
        SslMode::Disabled => PgSslMode::Disable,
        SslMode::Preferred => PgSslMode::Prefer,
        SslMode::Required => PgSslMode::Require,
        SslMode::VerifyCa => PgSslMode::VerifyCa,
        SslMode::VerifyIdentity => PgSslMode::VerifyFull,
    }
}

/// Connect options for a MySQL-family store.
pub fn mysql_connect_options(config: &DatabaseConfig) -> MySqlConnectOptions {
    let mut options = MySqlConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);
    if let Some(tls) = &config.tls {
        options = options.ssl_mode(mysql_ssl_mode(tls.mode));
        if let Some(ca) = &tls.ca {
            options = options.ssl_ca(ca);
        }
    }
    options
}

/// Connect options for a PostgreSQL-family store.
pub fn pg_connect_options(config: &DatabaseConfig) -> PgConnectOptions {
    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .username(&config.user)
        .password(&config.password)
        .database(&config.database);
    if let Some(tls) = &config.tls {
        options = options.ssl_mode(pg_ssl_mode(tls.mode));
        if let Some(ca) = &tls.ca {
            options = options.ssl_root_cert(ca);
        }
    }
    options
}

/// Opens the MySQL connection pool described by `config`.
pub async fn connect_mysql(config: &DatabaseConfig) -> Result<MySqlPool, StoreError> {
    let pool = MySqlPoolOptions::new()
        .min_connections(config.pool.min_connections)
        .max_connections(config.pool.max_connections)
        .connect_with(mysql_connect_options(config))
        .await
        .map_err(|e| {
            error!(
                "Failed to connect to MySQL at {}:{}/{}: {e}",
                config.host, config.port, config.database
            );
            StoreError::SqlError(e)
        })?;

    info!(
        "Connected to MySQL at {}:{}/{} (pool: {}..={})",
        config.host,
        config.port,
        config.database,
        config.pool.min_connections,
        config.pool.max_connections
    );
    Ok(pool)
}

/// Opens the PostgreSQL connection pool described by `config`.
pub async fn connect_postgres(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .min_connections(config.pool.min_connections)
        .max_connections(config.pool.max_connections)
        .connect_with(pg_connect_options(config))
        .await
        .map_err(|e| {
            error!(
                "Failed to connect to PostgreSQL at {}:{}/{}: {e}",
                config.host, config.port, config.database
            );
            StoreError::SqlError(e)
        })?;

    info!(
        "Connected to PostgreSQL at {}:{}/{} (pool: {}..={})",
        config.host,
        config.port,
        config.database,
        config.pool.min_connections,
        config.pool.max_connections
    );
    Ok(pool)
}
