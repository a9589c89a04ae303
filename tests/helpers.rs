// Shared test helpers: settings fixtures and in-memory sessions.

use std::sync::Arc;

use serde_json::{json, Value};

use crawl_sink::reconcile::{DatabaseKind, SessionContext};
use crawl_sink::storage::{text_schema, MemoryStore, Payload};
use crawl_sink::SessionOptions;

/// A valid settings section for `table_name` with `title` and `url` fields.
#[allow(dead_code)] // Used by other test files
pub fn section(table_name: &str) -> Value {
    json!({
        "host": "127.0.0.1",
        "user": "crawler",
        "password": "secret",
        "database": "crawl",
        "model": { "table_name": table_name, "title": "char", "url": "char(512)" }
    })
}

/// Settings with both databases configured.
#[allow(dead_code)]
pub fn both_settings() -> Value {
    json!({ "mysql": section("movies"), "postgres": section("movies") })
}

/// A session over two in-memory stores, returned alongside the stores.
#[allow(dead_code)]
pub fn memory_session(
    options: SessionOptions,
) -> (Arc<SessionContext>, Arc<MemoryStore>, Arc<MemoryStore>) {
    let mysql = Arc::new(MemoryStore::new(
        "mysql",
        text_schema("movies", &["title", "url"]),
    ));
    let postgres = Arc::new(MemoryStore::new(
        "postgres",
        text_schema("movies", &["title", "url"]),
    ));
    let session = SessionContext::new(options)
        .with_store(DatabaseKind::Mysql, mysql.clone())
        .with_store(DatabaseKind::Postgres, postgres.clone());
    (Arc::new(session), mysql, postgres)
}

/// Converts a `json!` object literal into a payload.
#[allow(dead_code)]
pub fn payload(value: Value) -> Payload {
    value
        .as_object()
        .cloned()
        .expect("payload literal must be an object")
}
