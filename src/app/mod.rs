//! Batch runner helpers: progress logging and statistics printing.

pub mod logging;
pub mod statistics;

pub use logging::log_progress;
pub use statistics::{print_outcome_statistics, print_simple_summary};
