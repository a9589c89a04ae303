//! Outcome statistics tracking.
//!
//! Thread-safe counters for the actions the reconciliation engine takes,
//! broken down per database, plus a counter for rejected callback results.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use strum::IntoEnumIterator;

use super::types::ActionType;
use crate::reconcile::{DatabaseKind, Outcome};

/// Thread-safe outcome statistics tracker.
///
/// Every `(database, action)` pair is initialized to zero on creation so that
/// incrementing never needs to allocate, allowing concurrent access from
/// many in-flight requests through an `Arc`.
pub struct OutcomeStats {
    actions: HashMap<(DatabaseKind, ActionType), AtomicUsize>,
    rejected: AtomicUsize,
}

impl OutcomeStats {
    pub fn new() -> Self {
        let mut actions = HashMap::new();
        for database in DatabaseKind::iter() {
            for action in ActionType::iter() {
                actions.insert((database, action), AtomicUsize::new(0));
            }
        }

        OutcomeStats {
            actions,
            rejected: AtomicUsize::new(0),
        }
    }

    /// Increment the counter for one database action.
    pub fn increment(&self, database: DatabaseKind, action: ActionType) {
        if let Some(counter) = self.actions.get(&(database, action)) {
            counter.fetch_add(1, Ordering::Relaxed);
        } else {
            log::error!(
                "Attempted to increment counter for ({:?}, {:?}) which is not in the map.",
                database,
                action
            );
        }
    }

    /// Record every per-database action carried by an outcome.
    pub fn record(&self, outcome: &Outcome) {
        for db in &outcome.databases {
            self.increment(db.database, db.action.action_type());
        }
    }

    /// Record a callback result rejected by validation.
    pub fn increment_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_count(&self, database: DatabaseKind, action: ActionType) -> usize {
        self.actions
            .get(&(database, action))
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    /// Total for one action across both databases.
    pub fn total(&self, action: ActionType) -> usize {
        DatabaseKind::iter()
            .map(|database| self.get_count(database, action))
            .sum()
    }

    pub fn rejected(&self) -> usize {
        self.rejected.load(Ordering::SeqCst)
    }
}

impl Default for OutcomeStats {
    fn default() -> Self {
        Self::new()
    }
}
