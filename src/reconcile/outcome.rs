//! Result of processing one callback result.

use serde::Serialize;

use crate::error_handling::ActionType;
use crate::reconcile::target::DatabaseKind;

/// What the engine did on one database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "error", rename_all = "snake_case")]
pub enum DatabaseAction {
    Created,
    Filtered,
    Updated,
    NotUpdated,
    NotCreated,
    /// A backend error, already logged; carries its message.
    Failed(String),
}

impl DatabaseAction {
    pub fn action_type(&self) -> ActionType {
        match self {
            DatabaseAction::Created => ActionType::Created,
            DatabaseAction::Filtered => ActionType::Filtered,
            DatabaseAction::Updated => ActionType::Updated,
            DatabaseAction::NotUpdated => ActionType::NotUpdated,
            DatabaseAction::NotCreated => ActionType::NotCreated,
            DatabaseAction::Failed(_) => ActionType::Failed,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, DatabaseAction::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatabaseOutcome {
    pub database: DatabaseKind,
    #[serde(flatten)]
    pub action: DatabaseAction,
}

/// Per-database actions plus the human-readable summary returned to the
/// caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome {
    pub message: String,
    pub databases: Vec<DatabaseOutcome>,
}

impl Outcome {
    /// The action taken on `database`, if it was targeted.
    pub fn action(&self, database: DatabaseKind) -> Option<&DatabaseAction> {
        self.databases
            .iter()
            .find(|d| d.database == database)
            .map(|d| &d.action)
    }

    /// True when no targeted database reported a backend failure.
    pub fn is_success(&self) -> bool {
        !self.databases.iter().any(|d| d.action.is_failure())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_outcome_serializes_per_database_actions() {
        let outcome = Outcome {
            message: "mysql: insert error: store unavailable".to_string(),
            databases: vec![
                DatabaseOutcome {
                    database: DatabaseKind::Mysql,
                    action: DatabaseAction::Failed("store unavailable".to_string()),
                },
                DatabaseOutcome {
                    database: DatabaseKind::Postgres,
                    action: DatabaseAction::Created,
                },
            ],
        };

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({
                "message": "mysql: insert error: store unavailable",
                "databases": [
                    {"database": "mysql", "action": "failed", "error": "store unavailable"},
                    {"database": "postgres", "action": "created"},
                ]
            })
        );
        assert!(!outcome.is_success());
        assert_eq!(outcome.action(DatabaseKind::Postgres), Some(&DatabaseAction::Created));
    }
}
