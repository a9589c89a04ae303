//! Error handling and outcome statistics.
//!
//! This module provides:
//! - Error type definitions for every layer (settings, requests, stores, startup)
//! - Outcome statistics tracking (actions per database, rejected requests)
//!
//! Propagation policy:
//! - **Configuration** and **validation** errors always reach the caller
//! - **Store** errors are absorbed per database and logged by the engine

mod stats;
mod types;

// Re-export public API
pub use stats::OutcomeStats;
pub use types::{
    ActionType, ConfigError, InitializationError, RequestKind, SessionError, StoreError,
    ValidationError,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile::{DatabaseAction, DatabaseKind, DatabaseOutcome, Outcome};
    use strum::IntoEnumIterator;

    #[test]
    fn test_outcome_stats_initialization() {
        let stats = OutcomeStats::new();
        for database in DatabaseKind::iter() {
            for action in ActionType::iter() {
                assert_eq!(stats.get_count(database, action), 0);
            }
        }
        assert_eq!(stats.rejected(), 0);
    }

    #[test]
    fn test_outcome_stats_increment() {
        let stats = OutcomeStats::new();
        stats.increment(DatabaseKind::Mysql, ActionType::Created);
        stats.increment(DatabaseKind::Mysql, ActionType::Created);
        stats.increment(DatabaseKind::Postgres, ActionType::Created);
        stats.increment(DatabaseKind::Postgres, ActionType::Filtered);

        assert_eq!(stats.get_count(DatabaseKind::Mysql, ActionType::Created), 2);
        assert_eq!(stats.total(ActionType::Created), 3);
        assert_eq!(stats.total(ActionType::Filtered), 1);
        assert_eq!(stats.total(ActionType::Updated), 0);
    }

    #[test]
    fn test_outcome_stats_record_outcome() {
        let stats = OutcomeStats::new();
        let outcome = Outcome {
            message: String::new(),
            databases: vec![
                DatabaseOutcome {
                    database: DatabaseKind::Mysql,
                    action: DatabaseAction::Updated,
                },
                DatabaseOutcome {
                    database: DatabaseKind::Postgres,
                    action: DatabaseAction::Failed("connection reset".to_string()),
                },
            ],
        };
        stats.record(&outcome);
        stats.increment_rejected();

        assert_eq!(stats.get_count(DatabaseKind::Mysql, ActionType::Updated), 1);
        assert_eq!(stats.get_count(DatabaseKind::Postgres, ActionType::Failed), 1);
        assert_eq!(stats.rejected(), 1);
    }
}
