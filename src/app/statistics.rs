//! End-of-run statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ActionType, OutcomeStats};
use crate::reconcile::DatabaseKind;

/// Logs per-database action counts and the number of rejected results.
///
/// Databases and actions with a zero count are left out.
pub fn print_outcome_statistics(stats: &OutcomeStats) {
    for database in DatabaseKind::iter() {
        let total: usize = ActionType::iter()
            .map(|action| stats.get_count(database, action))
            .sum();
        if total == 0 {
            continue;
        }
        info!("{} actions ({} total):", database, total);
        for action in ActionType::iter() {
            let count = stats.get_count(database, action);
            if count > 0 {
                info!("   {}: {}", action.as_str(), count);
            }
        }
    }

    let rejected = stats.rejected();
    if rejected > 0 {
        info!("Rejected callback results: {}", rejected);
    }
}

/// One-line summary of a finished batch.
pub fn print_simple_summary(processed: usize, rejected: usize, failed: usize, elapsed_seconds: f64) {
    info!(
        "✅ Processed {} callback result{} ({} rejected, {} with store failures) in {:.1}s",
        processed,
        if processed == 1 { "" } else { "s" },
        rejected,
        failed,
        elapsed_seconds
    );
}
