//! Per-line task processing.

use log::{debug, error};

use crate::error_handling::OutcomeStats;
use crate::reconcile::SessionContext;

use super::input::{parse_line, LineError};

/// What happened to one input line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemResult {
    /// Processed; every targeted database succeeded or was skipped by policy.
    Processed,
    /// Processed, but at least one database reported a store error.
    StoreFailure,
    /// Malformed JSON or a callback result that failed validation.
    Rejected,
}

/// Parses and processes one input line, recording its outcome in `stats`.
pub async fn process_line(
    session: &SessionContext,
    line_no: usize,
    line: &str,
    stats: &OutcomeStats,
) -> ItemResult {
    let result = match parse_line(line) {
        Ok(result) => result,
        Err(e) => {
            reject(line_no, &e, stats);
            return ItemResult::Rejected;
        }
    };

    match session.process(&result).await {
        Ok(outcome) => {
            stats.record(&outcome);
            match serde_json::to_string(&outcome) {
                Ok(json) => debug!("line {line_no}: {json}"),
                Err(_) => debug!("line {line_no}: {}", outcome.message),
            }
            if outcome.is_success() {
                ItemResult::Processed
            } else {
                ItemResult::StoreFailure
            }
        }
        Err(e) => {
            // The engine has already logged the rejection.
            debug!("line {line_no}: rejected: {e}");
            stats.increment_rejected();
            ItemResult::Rejected
        }
    }
}

fn reject(line_no: usize, err: &LineError, stats: &OutcomeStats) {
    error!("line {line_no}: {err}");
    stats.increment_rejected();
}
