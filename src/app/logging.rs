//! Progress logging utilities.

use log::info;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Logs how many callback results have been processed so far and the rate.
pub fn log_progress(start_time: std::time::Instant, processed: &AtomicUsize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let processed = processed.load(Ordering::SeqCst);
    let rate = if elapsed_secs > 0.0 {
        processed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Processed {} callback results in {:.2} seconds (~{:.2}/sec)",
        processed, elapsed_secs, rate
    );
}
