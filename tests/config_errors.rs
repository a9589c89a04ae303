//! Settings validation and session startup errors seen through the public API.

mod helpers;

use serde_json::json;

use crawl_sink::reconcile::SessionContext;
use crawl_sink::{validate_settings, ConfigError, SessionError, SessionOptions};
use helpers::section;

#[test]
fn test_no_database_configured() {
    let err = validate_settings(&json!({})).unwrap_err();
    assert_eq!(err, ConfigError::NoDatabase);
    assert_eq!(
        err.to_string(),
        "must have at least one of mysql or postgres configuration"
    );

    let err = validate_settings(&json!({"mysql": {}, "postgres": {}})).unwrap_err();
    assert_eq!(err, ConfigError::NoDatabase);
}

#[test]
fn test_missing_keys_are_all_named() {
    let err = validate_settings(&json!({"mysql": {"port": 3306}})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Key 'mysql' error: Missing keys: 'database', 'host', 'model', 'password', 'user'"
    );
}

#[test]
fn test_wrong_port_type() {
    let mut mysql = section("movies");
    mysql["port"] = json!("3306");
    let err = validate_settings(&json!({ "mysql": mysql })).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Key 'mysql' error: 'port' should be instance of 'int'"
    );
}

#[test]
fn test_unknown_key_rejected() {
    let mut postgres = section("movies");
    postgres["weird"] = json!(true);
    let err = validate_settings(&json!({ "postgres": postgres })).unwrap_err();
    assert_eq!(err.to_string(), "Key 'postgres' error: Wrong key 'weird'");
}

#[test]
fn test_model_without_table_name() {
    let mut mysql = section("movies");
    mysql["model"] = json!({"title": "char"});
    let err = validate_settings(&json!({ "mysql": mysql })).unwrap_err();
    assert!(matches!(err, ConfigError::MissingTableName { .. }));
}

#[test]
fn test_valid_settings_normalize_defaults() {
    let settings = validate_settings(&helpers::both_settings()).unwrap();
    let mysql = settings.mysql.unwrap();
    let postgres = settings.postgres.unwrap();
    assert_eq!(mysql.port, 3306);
    assert_eq!(postgres.port, 5432);
    assert_eq!(mysql.schema.table_name, "movies");
    assert_eq!(mysql.schema.fields.len(), 2);
}

#[tokio::test]
async fn test_start_rejects_invalid_settings_before_connecting() {
    let result = SessionContext::start(&json!({"mysql": {"host": "db"}}), SessionOptions::default()).await;
    assert!(matches!(
        result,
        Err(SessionError::Config(ConfigError::MissingKeys { .. }))
    ));
}

#[tokio::test]
async fn test_in_memory_session_installs_every_schema() {
    let settings = validate_settings(&helpers::both_settings()).unwrap();
    let session = SessionContext::in_memory(&settings, SessionOptions::default())
        .await
        .unwrap();
    assert_eq!(session.handles().count(), 2);
}
