//! Reading callback results from a JSON-lines source.

use std::path::Path;

use anyhow::{Context, Result};
use log::info;
use serde_json::Value;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::error_handling::ValidationError;
use crate::reconcile::CallbackResult;

pub type InputLines = Lines<Box<dyn AsyncBufRead + Unpin + Send>>;

/// Opens `path` for line-by-line reading; `-` means stdin.
pub async fn open_input(path: &Path) -> Result<InputLines> {
    let reader: Box<dyn AsyncBufRead + Unpin + Send> = if path.as_os_str() == "-" {
        info!("Reading callback results from stdin");
        Box::new(BufReader::new(tokio::io::stdin()))
    } else {
        let file = tokio::fs::File::open(path)
            .await
            .with_context(|| format!("Failed to open input file {}", path.display()))?;
        info!("Reading callback results from {}", path.display());
        Box::new(BufReader::new(file))
    };
    Ok(reader.lines())
}

/// Why an input line was not turned into a callback result.
#[derive(Error, Debug)]
pub enum LineError {
    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Whether a line carries content (blank lines and `#` comments do not).
pub fn is_content(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Parses one line into a callback result.
pub fn parse_line(line: &str) -> Result<CallbackResult, LineError> {
    let value: Value = serde_json::from_str(line.trim())?;
    Ok(CallbackResult::from_value(value)?)
}
