//! Batch runner tests using dry-run (in-memory) sessions.

mod helpers;

use std::io::Write;
use std::path::PathBuf;

use crawl_sink::error_handling::ActionType;
use crawl_sink::reconcile::DatabaseKind;
use crawl_sink::{run_batch, Config};

fn write_temp(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
    write_temp_bytes(suffix, contents.as_bytes())
}

fn write_temp_bytes(suffix: &str, contents: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn dry_run_config(settings: PathBuf, input: PathBuf) -> Config {
    Config {
        settings,
        input,
        max_concurrency: 1,
        dry_run: true,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_dry_run_batch_counts_every_outcome() {
    let settings = write_temp(".json", &helpers::both_settings().to_string());
    let input = write_temp(
        ".jsonl",
        r#"{"kind": "insert", "data": {"title": "A", "url": "http://x"}, "database": "both"}
{"kind": "insert", "data": {"title": "B", "url": "http://x"}, "filters": "url"}
# comments and blank lines are skipped

{not json
{"kind": "update", "data": {"url": "http://y"}, "query": {"title": "A"}, "database": "postgres", "not_update_when_exists": false}
{"data": {"title": "C"}, "database": "postgres"}
{"data": {}}
{"data": {"director": "X"}}
"#,
    );

    let report = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        input.path().to_path_buf(),
    ))
    .await
    .unwrap();

    assert_eq!(report.processed, 7);
    assert_eq!(report.rejected, 2);
    assert_eq!(report.failed, 1);

    let stats = &report.stats;
    assert_eq!(stats.get_count(DatabaseKind::Mysql, ActionType::Created), 1);
    assert_eq!(stats.get_count(DatabaseKind::Mysql, ActionType::Filtered), 1);
    assert_eq!(stats.get_count(DatabaseKind::Mysql, ActionType::Failed), 1);
    assert_eq!(stats.get_count(DatabaseKind::Postgres, ActionType::Created), 2);
    assert_eq!(stats.get_count(DatabaseKind::Postgres, ActionType::Updated), 1);
    assert_eq!(stats.rejected(), 2);
}

#[tokio::test]
async fn test_undecodable_line_is_rejected_and_reading_continues() {
    let settings = write_temp(".json", &helpers::both_settings().to_string());
    let mut contents = Vec::new();
    contents.extend_from_slice(b"{\"data\": {\"title\": \"A\"}}\n");
    contents.extend_from_slice(b"{\"data\": {\"title\": \"\xff\xfe\"}}\n");
    contents.extend_from_slice(b"{\"data\": {\"title\": \"B\"}}\n");
    contents.extend_from_slice(b"{\"data\": {\"title\": \"C\"}}\n");
    let input = write_temp_bytes(".jsonl", &contents);

    let report = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        input.path().to_path_buf(),
    ))
    .await
    .unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.rejected, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(report.stats.rejected(), 1);
    assert_eq!(
        report.stats.get_count(DatabaseKind::Mysql, ActionType::Created),
        3
    );
}

#[tokio::test]
async fn test_toml_settings_file() {
    let settings = write_temp(
        ".toml",
        r#"
[postgres]
host = "127.0.0.1"
user = "crawler"
password = "secret"
database = "crawl"

[postgres.model]
table_name = "movies"
title = "char"
"#,
    );
    let input = write_temp(".jsonl", r#"{"data": {"title": "A"}, "database": "postgres"}"#);

    let report = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        input.path().to_path_buf(),
    ))
    .await
    .unwrap();

    assert_eq!(report.processed, 1);
    assert_eq!(
        report
            .stats
            .get_count(DatabaseKind::Postgres, ActionType::Created),
        1
    );
}

#[tokio::test]
async fn test_target_missing_from_settings_is_rejected() {
    let settings = write_temp(
        ".json",
        &serde_json::json!({ "mysql": helpers::section("movies") }).to_string(),
    );
    let input = write_temp(".jsonl", r#"{"data": {"title": "A"}, "database": "both"}"#);

    let report = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        input.path().to_path_buf(),
    ))
    .await
    .unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(report.stats.total(ActionType::Created), 0);
}

#[tokio::test]
async fn test_invalid_settings_abort_the_run() {
    let settings = write_temp(".json", r#"{"mysql": {"host": "db"}}"#);
    let input = write_temp(".jsonl", "");

    let err = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        input.path().to_path_buf(),
    ))
    .await
    .err()
    .unwrap();

    assert!(format!("{err:#}").contains("Missing keys"));
}

#[tokio::test]
async fn test_missing_input_file() {
    let settings = write_temp(".json", &helpers::both_settings().to_string());

    let result = run_batch(dry_run_config(
        settings.path().to_path_buf(),
        PathBuf::from("/nonexistent/items.jsonl"),
    ))
    .await;

    assert!(result.is_err());
}
