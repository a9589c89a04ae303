//! Settings file loading.

use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Reads a settings file into the loosely typed mapping accepted by
/// [`validate_settings`](super::validate_settings).
///
/// Files ending in `.json` are parsed as JSON; everything else as TOML.
/// The result is not validated here.
pub fn load_settings_file(path: &Path) -> Result<Value> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read settings file {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse JSON settings {}", path.display()))
    } else {
        toml::from_str(&raw)
            .with_context(|| format!("Failed to parse TOML settings {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_toml_settings() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[postgres]
host = "127.0.0.1"
port = 5432
user = "crawler"
password = "abc123"
database = "crawl"

[postgres.model]
table_name = "movies"
title = "char"
url = "text"
"#
        )
        .unwrap();

        let value = load_settings_file(file.path()).unwrap();
        assert_eq!(value["postgres"]["port"], 5432);
        assert_eq!(value["postgres"]["model"]["table_name"], "movies");
    }

    #[test]
    fn test_load_json_settings() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"mysql": {{"host": "db"}}}}"#).unwrap();

        let value = load_settings_file(file.path()).unwrap();
        assert_eq!(value["mysql"]["host"], "db");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_settings_file(Path::new("/nonexistent/crawl_sink.toml")).unwrap_err();
        assert!(err.to_string().contains("Failed to read settings file"));
    }

    #[test]
    fn test_load_malformed_json() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, "{{not json").unwrap();
        assert!(load_settings_file(file.path()).is_err());
    }
}
