//! Settings validation.
//!
//! Turns the loosely typed `{ "mysql": {...}, "postgres": {...} }` mapping
//! supplied by the caller into normalized [`DatabaseConfig`]s. The schema is
//! strict: unknown keys, missing keys and mistyped values are all rejected.
//! Nothing here opens a connection or touches a table.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::config::constants::{
    DEFAULT_MAX_CONNECTIONS, DEFAULT_MIN_CONNECTIONS, DEFAULT_MYSQL_PORT, DEFAULT_POSTGRES_PORT,
    IDENTIFIER_PATTERN, MAX_CONNECTIONS_RANGE, MIN_CONNECTIONS_RANGE, MYSQL_SECTION,
    OPTIONAL_KEYS, POSTGRES_SECTION, PRIMARY_KEY_COLUMN, REQUIRED_KEYS,
};
use crate::config::schema::{FieldDef, FieldType, RecordSchema};
use crate::config::types::{DatabaseConfig, PoolConfig, Settings, SslMode, TlsConfig};
use crate::error_handling::ConfigError;

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IDENTIFIER_PATTERN).expect("identifier pattern is a valid regex"));

/// Returns true if `name` can be used unquoted as a table or column name.
pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER.is_match(name)
}

/// Validates the settings mapping.
///
/// # Errors
///
/// Returns a [`ConfigError`] describing the first problem found. Sections are
/// checked MySQL first, then PostgreSQL.
///
/// # Example
///
/// ```
/// use crawl_sink::config::validate_settings;
/// use serde_json::json;
///
/// let settings = validate_settings(&json!({
///     "mysql": {
///         "host": "127.0.0.1",
///         "port": 3306,
///         "user": "crawler",
///         "password": "secret",
///         "database": "crawl",
///         "model": { "table_name": "movies", "title": "char", "url": "char" }
///     }
/// }))
/// .unwrap();
/// assert!(settings.postgres.is_none());
/// ```
pub fn validate_settings(settings: &Value) -> Result<Settings, ConfigError> {
    let root = match settings {
        Value::Null => return Err(ConfigError::NoDatabase),
        Value::Object(map) => map,
        _ => return Err(ConfigError::NotAMapping),
    };

    if let Some(key) = root
        .keys()
        .find(|k| k.as_str() != MYSQL_SECTION && k.as_str() != POSTGRES_SECTION)
    {
        return Err(ConfigError::UnknownKey {
            section: "settings".to_string(),
            key: key.clone(),
        });
    }

    let mysql = supplied(root, MYSQL_SECTION);
    let postgres = supplied(root, POSTGRES_SECTION);
    let all_empty = [mysql, postgres]
        .iter()
        .flatten()
        .all(|v| v.as_object().is_some_and(Map::is_empty));
    if all_empty {
        return Err(ConfigError::NoDatabase);
    }

    Ok(Settings {
        mysql: mysql
            .map(|v| validate_section(MYSQL_SECTION, v, DEFAULT_MYSQL_PORT))
            .transpose()?,
        postgres: postgres
            .map(|v| validate_section(POSTGRES_SECTION, v, DEFAULT_POSTGRES_PORT))
            .transpose()?,
    })
}

fn supplied<'a>(root: &'a Map<String, Value>, key: &str) -> Option<&'a Value> {
    root.get(key).filter(|v| !v.is_null())
}

fn validate_section(
    section: &str,
    value: &Value,
    default_port: u16,
) -> Result<DatabaseConfig, ConfigError> {
    let map = value.as_object().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: section.to_string(),
        expected: "dict",
    })?;

    let mut unknown: Vec<&String> = map
        .keys()
        .filter(|k| !REQUIRED_KEYS.contains(&k.as_str()) && !OPTIONAL_KEYS.contains(&k.as_str()))
        .collect();
    unknown.sort();
    if let Some(key) = unknown.first() {
        return Err(ConfigError::UnknownKey {
            section: section.to_string(),
            key: (*key).clone(),
        });
    }

    let missing: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|k| !map.contains_key(**k))
        .map(|k| k.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ConfigError::MissingKeys {
            section: section.to_string(),
            keys: missing,
        });
    }

    let host = required_str(section, map, "host")?;
    let user = required_str(section, map, "user")?;
    let password = required_str(section, map, "password")?;
    let database = required_str(section, map, "database")?;

    let port = match map.get("port") {
        None => default_port,
        Some(v) => {
            let port = integer(section, "port", v)?;
            u16::try_from(port)
                .ok()
                .filter(|p| *p > 0)
                .ok_or_else(|| ConfigError::OutOfRange {
                    section: section.to_string(),
                    key: "port".to_string(),
                    min: 1,
                    max: i64::from(u16::MAX),
                })?
        }
    };

    let pool = validate_pool(section, map)?;
    let tls = map
        .get("ssl")
        .map(|v| validate_ssl(section, v))
        .transpose()?
        .flatten();
    let schema = validate_model(section, &map["model"])?;

    Ok(DatabaseConfig {
        host,
        port,
        user,
        password,
        database,
        pool,
        tls,
        schema,
    })
}

fn required_str(section: &str, map: &Map<String, Value>, key: &str) -> Result<String, ConfigError> {
    map.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ConfigError::WrongType {
            section: section.to_string(),
            key: key.to_string(),
            expected: "str",
        })
}

fn integer(section: &str, key: &str, value: &Value) -> Result<i64, ConfigError> {
    value.as_i64().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: key.to_string(),
        expected: "int",
    })
}

fn bounded(section: &str, key: &str, value: &Value, range: (i64, i64)) -> Result<u32, ConfigError> {
    let n = integer(section, key, value)?;
    if n < range.0 || n > range.1 {
        return Err(ConfigError::OutOfRange {
            section: section.to_string(),
            key: key.to_string(),
            min: range.0,
            max: range.1,
        });
    }
    // Range bounds are small positive numbers
    Ok(n as u32)
}

fn validate_pool(section: &str, map: &Map<String, Value>) -> Result<PoolConfig, ConfigError> {
    let pooled = match map.get("pool") {
        None => false,
        Some(v) => v.as_bool().ok_or_else(|| ConfigError::WrongType {
            section: section.to_string(),
            key: "pool".to_string(),
            expected: "bool",
        })?,
    };

    if !pooled {
        // Bounds are type checked even when unused
        for key in ["min_connections", "max_connections"] {
            if let Some(v) = map.get(key) {
                integer(section, key, v)?;
            }
        }
        return Ok(PoolConfig::single());
    }

    let min_connections = map
        .get("min_connections")
        .map(|v| bounded(section, "min_connections", v, MIN_CONNECTIONS_RANGE))
        .transpose()?
        .unwrap_or(DEFAULT_MIN_CONNECTIONS);
    let max_connections = map
        .get("max_connections")
        .map(|v| bounded(section, "max_connections", v, MAX_CONNECTIONS_RANGE))
        .transpose()?
        .unwrap_or(DEFAULT_MAX_CONNECTIONS);
    if min_connections > max_connections {
        return Err(ConfigError::PoolBounds {
            section: section.to_string(),
            min: min_connections,
            max: max_connections,
        });
    }

    Ok(PoolConfig {
        pooled: true,
        min_connections,
        max_connections,
    })
}

fn parse_ssl_mode(section: &str, mode: &str) -> Result<SslMode, ConfigError> {
    match mode.to_ascii_lowercase().replace('-', "_").as_str() {
        "disabled" | "disable" => Ok(SslMode::Disabled),
        "preferred" | "prefer" => Ok(SslMode::Preferred),
        "required" | "require" => Ok(SslMode::Required),
        "verify_ca" => Ok(SslMode::VerifyCa),
        "verify_identity" | "verify_full" => Ok(SslMode::VerifyIdentity),
        _ => Err(ConfigError::UnknownSslMode {
            section: section.to_string(),
            value: mode.to_string(),
        }),
    }
}

/// `ssl` accepts `true`/`false`, a mode string, or `{ mode, ca }`. `null`
/// leaves the driver default in place.
fn validate_ssl(section: &str, value: &Value) -> Result<Option<TlsConfig>, ConfigError> {
    let wrong_type = || ConfigError::WrongType {
        section: section.to_string(),
        key: "ssl".to_string(),
        expected: "bool, str or dict",
    };
    match value {
        Value::Null => Ok(None),
        Value::Bool(false) => Ok(Some(TlsConfig {
            mode: SslMode::Disabled,
            ca: None,
        })),
        Value::Bool(true) => Ok(Some(TlsConfig {
            mode: SslMode::Required,
            ca: None,
        })),
        Value::String(mode) => Ok(Some(TlsConfig {
            mode: parse_ssl_mode(section, mode)?,
            ca: None,
        })),
        Value::Object(map) => {
            if let Some(key) = map.keys().find(|k| k.as_str() != "mode" && k.as_str() != "ca") {
                return Err(ConfigError::UnknownKey {
                    section: format!("{section}.ssl"),
                    key: key.clone(),
                });
            }
            let ca = match map.get("ca") {
                None | Some(Value::Null) => None,
                Some(Value::String(path)) => Some(PathBuf::from(path)),
                Some(_) => {
                    return Err(ConfigError::WrongType {
                        section: section.to_string(),
                        key: "ssl.ca".to_string(),
                        expected: "str",
                    })
                }
            };
            let mode = match map.get("mode") {
                None => {
                    if ca.is_some() {
                        SslMode::VerifyCa
                    } else {
                        SslMode::Required
                    }
                }
                Some(Value::String(mode)) => parse_ssl_mode(section, mode)?,
                Some(_) => {
                    return Err(ConfigError::WrongType {
                        section: section.to_string(),
                        key: "ssl.mode".to_string(),
                        expected: "str",
                    })
                }
            };
            Ok(Some(TlsConfig { mode, ca }))
        }
        _ => Err(wrong_type()),
    }
}

fn validate_model(section: &str, value: &Value) -> Result<RecordSchema, ConfigError> {
    let model = value.as_object().ok_or_else(|| ConfigError::WrongType {
        section: section.to_string(),
        key: "model".to_string(),
        expected: "dict",
    })?;

    let table_name = match model.get("table_name") {
        None => {
            return Err(ConfigError::MissingTableName {
                section: section.to_string(),
            })
        }
        Some(v) => v.as_str().ok_or_else(|| ConfigError::WrongType {
            section: section.to_string(),
            key: "model.table_name".to_string(),
            expected: "str",
        })?,
    };
    if !is_valid_identifier(table_name) {
        return Err(ConfigError::InvalidIdentifier {
            section: section.to_string(),
            name: table_name.to_string(),
        });
    }

    let mut fields = Vec::with_capacity(model.len().saturating_sub(1));
    for (name, decl) in model.iter().filter(|(k, _)| k.as_str() != "table_name") {
        if name.eq_ignore_ascii_case(PRIMARY_KEY_COLUMN) {
            return Err(ConfigError::ReservedField {
                section: section.to_string(),
                field: name.clone(),
            });
        }
        if !is_valid_identifier(name) {
            return Err(ConfigError::InvalidIdentifier {
                section: section.to_string(),
                name: name.clone(),
            });
        }
        let field_type = decl
            .as_str()
            .and_then(|s| s.parse::<FieldType>().ok())
            .ok_or_else(|| ConfigError::UnknownFieldType {
                section: section.to_string(),
                field: name.clone(),
                value: match decl {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                },
            })?;
        fields.push(FieldDef {
            name: name.clone(),
            field_type,
        });
    }

    if fields.is_empty() {
        return Err(ConfigError::EmptyModel {
            section: section.to_string(),
        });
    }

    Ok(RecordSchema::new(table_name, fields))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn mysql_section() -> Value {
        json!({
            "host": "127.0.0.1",
            "port": 3306,
            "user": "crawler",
            "password": "abc123",
            "database": "crawl",
            "model": {
                "table_name": "movies",
                "title": "char",
                "url": "char(512)",
            },
        })
    }

    fn with(section: Value, key: &str, value: Value) -> Value {
        let mut section = section;
        section[key] = value;
        section
    }

    fn without(section: Value, key: &str) -> Value {
        let mut section = section;
        if let Some(map) = section.as_object_mut() {
            map.remove(key);
        }
        section
    }

    #[test]
    fn test_valid_mysql_only() {
        let settings = validate_settings(&json!({ "mysql": mysql_section() })).unwrap();
        let mysql = settings.mysql.unwrap();
        assert!(settings.postgres.is_none());
        assert_eq!(mysql.port, 3306);
        assert_eq!(mysql.schema.table_name, "movies");
        assert_eq!(
            mysql.schema.field_names().collect::<Vec<_>>(),
            vec!["title", "url"]
        );
        assert_eq!(mysql.schema.field_type("url"), Some(FieldType::Char(512)));
        assert_eq!(mysql.pool, PoolConfig::single());
        assert!(mysql.tls.is_none());
    }

    #[test]
    fn test_port_defaults_per_dialect() {
        let section = without(mysql_section(), "port");
        let settings =
            validate_settings(&json!({ "mysql": section.clone(), "postgres": section })).unwrap();
        assert_eq!(settings.mysql.unwrap().port, DEFAULT_MYSQL_PORT);
        assert_eq!(settings.postgres.unwrap().port, DEFAULT_POSTGRES_PORT);
    }

    #[test]
    fn test_no_database() {
        assert_eq!(validate_settings(&json!({})), Err(ConfigError::NoDatabase));
        assert_eq!(validate_settings(&Value::Null), Err(ConfigError::NoDatabase));
        assert_eq!(
            validate_settings(&json!({ "mysql": {} })),
            Err(ConfigError::NoDatabase)
        );
        assert_eq!(
            validate_settings(&json!({ "mysql": {}, "postgres": {} })),
            Err(ConfigError::NoDatabase)
        );
        assert_eq!(
            validate_settings(&json!({ "mysql": null })),
            Err(ConfigError::NoDatabase)
        );
        assert_eq!(
            validate_settings(&json!(["mysql"])),
            Err(ConfigError::NotAMapping)
        );
    }

    #[test]
    fn test_empty_section_next_to_valid_one_is_rejected() {
        let err = validate_settings(&json!({ "mysql": mysql_section(), "postgres": {} }))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.starts_with("Key 'postgres' error"));
        assert!(msg.contains("Missing keys: 'database', 'host', 'model', 'password', 'user'"));
    }

    #[test]
    fn test_missing_password() {
        let err =
            validate_settings(&json!({ "mysql": without(mysql_section(), "password") }))
                .unwrap_err();
        assert_eq!(
            err,
            ConfigError::MissingKeys {
                section: "mysql".to_string(),
                keys: vec!["password".to_string()],
            }
        );
    }

    #[test]
    fn test_missing_model() {
        let err = validate_settings(&json!({ "postgres": without(mysql_section(), "model") }))
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingKeys { ref keys, .. } if keys == &["model"]));
    }

    #[test]
    fn test_unknown_key_is_rejected() {
        let section = with(mysql_section(), "weird", json!("weird value"));
        let err = validate_settings(&json!({ "postgres": section })).unwrap_err();
        assert!(err.to_string().contains("Wrong key 'weird'"));

        let err = validate_settings(&json!({ "mongo": mysql_section() })).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey { ref key, .. } if key == "mongo"));
    }

    #[test]
    fn test_wrong_port_type() {
        let section = with(mysql_section(), "port", json!("weird value"));
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Key 'mysql' error: 'port' should be instance of 'int'"
        );

        let section = with(mysql_section(), "port", json!(70000));
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { ref key, .. } if key == "port"));
    }

    #[test]
    fn test_wrong_string_type() {
        let section = with(mysql_section(), "user", json!(42));
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert!(matches!(err, ConfigError::WrongType { ref key, expected: "str", .. } if key == "user"));
    }

    #[test]
    fn test_model_without_table_name() {
        let mut section = mysql_section();
        section["model"].as_object_mut().unwrap().remove("table_name");
        let err = validate_settings(&json!({ "postgres": section })).unwrap_err();
        assert!(err
            .to_string()
            .contains("Key 'model' error: Missing key: 'table_name'"));
    }

    #[test]
    fn test_model_without_fields() {
        let section = with(mysql_section(), "model", json!({ "table_name": "movies" }));
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert_eq!(
            err,
            ConfigError::EmptyModel {
                section: "mysql".to_string()
            }
        );
    }

    #[test]
    fn test_model_rejects_bad_names_and_types() {
        let section = with(
            mysql_section(),
            "model",
            json!({ "table_name": "movies; DROP TABLE x", "title": "char" }),
        );
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidIdentifier { .. }));

        let section = with(
            mysql_section(),
            "model",
            json!({ "table_name": "movies", "id": "integer" }),
        );
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert!(matches!(err, ConfigError::ReservedField { .. }));

        let section = with(
            mysql_section(),
            "model",
            json!({ "table_name": "movies", "title": "blob" }),
        );
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownFieldType { ref value, .. } if value == "blob"));
    }

    #[test]
    fn test_pool_bounds() {
        let section = with(mysql_section(), "pool", json!(true));
        let section = with(section, "min_connections", json!(5));
        let section = with(section, "max_connections", json!(20));
        let settings = validate_settings(&json!({ "mysql": section.clone(), "postgres": section }))
            .unwrap();
        let pool = settings.mysql.unwrap().pool;
        assert!(pool.pooled);
        assert_eq!(pool.min_connections, 5);
        assert_eq!(pool.max_connections, 20);
        assert_eq!(settings.postgres.unwrap().pool, pool);
    }

    #[test]
    fn test_pool_bounds_out_of_range() {
        let section = with(mysql_section(), "pool", json!(true));
        let section = with(section, "max_connections", json!(50));
        let err = validate_settings(&json!({ "mysql": section })).unwrap_err();
        assert_eq!(
            err,
            ConfigError::OutOfRange {
                section: "mysql".to_string(),
                key: "max_connections".to_string(),
                min: 10,
                max: 20,
            }
        );
    }

    #[test]
    fn test_pool_bounds_ignored_without_pooling() {
        let section = with(mysql_section(), "max_connections", json!(50));
        let settings = validate_settings(&json!({ "mysql": section })).unwrap();
        assert_eq!(settings.mysql.unwrap().pool, PoolConfig::single());

        let section = with(mysql_section(), "max_connections", json!("many"));
        assert!(validate_settings(&json!({ "mysql": section })).is_err());
    }

    #[test]
    fn test_ssl_forms() {
        let section = with(mysql_section(), "ssl", json!(true));
        let tls = validate_settings(&json!({ "mysql": section }))
            .unwrap()
            .mysql
            .unwrap()
            .tls
            .unwrap();
        assert_eq!(tls.mode, SslMode::Required);

        let section = with(mysql_section(), "ssl", json!({ "ca": "/etc/ssl/ca.pem" }));
        let tls = validate_settings(&json!({ "mysql": section }))
            .unwrap()
            .mysql
            .unwrap()
            .tls
            .unwrap();
        assert_eq!(tls.mode, SslMode::VerifyCa);
        assert_eq!(tls.ca, Some(PathBuf::from("/etc/ssl/ca.pem")));

        let section = with(mysql_section(), "ssl", json!("verify-full"));
        let tls = validate_settings(&json!({ "mysql": section }))
            .unwrap()
            .mysql
            .unwrap()
            .tls
            .unwrap();
        assert_eq!(tls.mode, SslMode::VerifyIdentity);

        let section = with(mysql_section(), "ssl", json!("sometimes"));
        assert!(matches!(
            validate_settings(&json!({ "mysql": section })),
            Err(ConfigError::UnknownSslMode { .. })
        ));
    }

    #[test]
    fn test_identifier_pattern() {
        assert!(is_valid_identifier("ruia_mysql"));
        assert!(is_valid_identifier("_private"));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("a-b"));
        assert!(!is_valid_identifier(""));
    }
}
