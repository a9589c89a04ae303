//! Batch processing of callback results.
//!
//! Reads one JSON callback result per line, processes them concurrently
//! against a shared [`SessionContext`] and tallies the outcome.

mod input;
mod task;

use std::io::ErrorKind;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::{info, warn};

use crate::app::{log_progress, print_outcome_statistics, print_simple_summary};
use crate::config::{load_settings_file, validate_settings, Config, LOGGING_INTERVAL};
use crate::error_handling::OutcomeStats;
use crate::initialization::init_semaphore;
use crate::reconcile::SessionContext;

pub use input::{is_content, open_input, parse_line, LineError};
pub use task::{process_line, ItemResult};

/// Summary of a finished batch.
#[derive(Clone)]
pub struct BatchReport {
    /// Content lines read from the input
    pub processed: usize,
    /// Lines rejected as malformed or invalid
    pub rejected: usize,
    /// Lines where at least one database reported a store error
    pub failed: usize,
    pub elapsed_seconds: f64,
    /// Per-database action counts
    pub stats: Arc<OutcomeStats>,
}

/// Loads settings, starts a session and processes the configured input.
///
/// With `dry_run` set the session is backed by in-memory stores and no
/// database is contacted.
///
/// # Errors
///
/// Fails if the settings file cannot be read or is invalid, if a database
/// cannot be reached or its table cannot be created, or if the input cannot
/// be opened.
pub async fn run_batch(config: Config) -> Result<BatchReport> {
    let raw = load_settings_file(&config.settings)?;
    let settings = validate_settings(&raw).context("Invalid database settings")?;
    let options = config.session_options();

    let session = if config.dry_run {
        info!("Dry run: using in-memory stores");
        SessionContext::in_memory(&settings, options).await
    } else {
        SessionContext::connect(&settings, options).await
    }
    .context("Failed to start session")?;

    run_with_session(Arc::new(session), &config).await
}

/// Processes the configured input against an already started session.
pub async fn run_with_session(session: Arc<SessionContext>, config: &Config) -> Result<BatchReport> {
    let mut lines = open_input(&config.input).await?;
    let semaphore = init_semaphore(config.max_concurrency);
    let stats = Arc::new(OutcomeStats::new());
    let processed = Arc::new(AtomicUsize::new(0));
    let start_time = std::time::Instant::now();

    let progress = {
        let processed = Arc::clone(&processed);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(LOGGING_INTERVAL);
            interval.tick().await;
            loop {
                interval.tick().await;
                log_progress(start_time, &processed);
            }
        })
    };

    let mut tasks = FuturesUnordered::new();
    let mut line_no = 0usize;
    let mut submitted = 0usize;
    let mut rejected = 0usize;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            // The undecodable line is consumed; reading resumes at the next one.
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                line_no += 1;
                submitted += 1;
                rejected += 1;
                stats.increment_rejected();
                warn!("line {line_no}: unreadable input: {e}");
                continue;
            }
            Err(e) => {
                progress.abort();
                return Err(e).with_context(|| format!("Failed to read input after line {line_no}"));
            }
        };
        line_no += 1;
        if !is_content(&line) {
            continue;
        }
        submitted += 1;

        let permit = Arc::clone(&semaphore)
            .acquire_owned()
            .await
            .context("Concurrency limiter closed")?;
        let session = Arc::clone(&session);
        let stats = Arc::clone(&stats);
        let processed = Arc::clone(&processed);
        tasks.push(tokio::spawn(async move {
            let _permit = permit;
            let result = process_line(&session, line_no, &line, &stats).await;
            processed.fetch_add(1, Ordering::SeqCst);
            result
        }));
    }

    let mut failed = 0usize;
    while let Some(joined) = tasks.next().await {
        match joined {
            Ok(ItemResult::Processed) => {}
            Ok(ItemResult::StoreFailure) => failed += 1,
            Ok(ItemResult::Rejected) => rejected += 1,
            Err(e) => {
                warn!("Callback task panicked: {e}");
                failed += 1;
            }
        }
    }
    progress.abort();

    let report = BatchReport {
        processed: submitted,
        rejected,
        failed,
        elapsed_seconds: start_time.elapsed().as_secs_f64(),
        stats,
    };
    print_outcome_statistics(&report.stats);
    print_simple_summary(
        report.processed,
        report.rejected,
        report.failed,
        report.elapsed_seconds,
    );
    Ok(report)
}
