//! Target database selection.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::{EnumIter as EnumIterMacro, EnumString};

use crate::config::{MYSQL_SECTION, POSTGRES_SECTION};

/// One of the two backing stores a session can write to.
///
/// Declaration order is fan-out order: MySQL is always attempted first.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, EnumIterMacro, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Mysql,
    Postgres,
}

impl DatabaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DatabaseKind::Mysql => MYSQL_SECTION,
            DatabaseKind::Postgres => POSTGRES_SECTION,
        }
    }
}

impl fmt::Display for DatabaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which store(s) a callback result is written to.
///
/// Parses case-insensitively from `mysql`, `postgres` (or `postgresql`) and
/// `both`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(ascii_case_insensitive)]
pub enum TargetSelector {
    #[default]
    #[strum(serialize = "mysql")]
    Mysql,
    #[strum(serialize = "postgres", serialize = "postgresql")]
    Postgres,
    #[strum(serialize = "both")]
    Both,
}

impl TargetSelector {
    /// The databases this selector fans out to, in attempt order.
    pub fn resolve(&self) -> Vec<DatabaseKind> {
        match self {
            TargetSelector::Mysql => vec![DatabaseKind::Mysql],
            TargetSelector::Postgres => vec![DatabaseKind::Postgres],
            TargetSelector::Both => vec![DatabaseKind::Mysql, DatabaseKind::Postgres],
        }
    }

    /// Maps the numeric form used by crawler enums (0, 1, 2).
    pub fn from_index(index: u64) -> Option<Self> {
        match index {
            0 => Some(TargetSelector::Mysql),
            1 => Some(TargetSelector::Postgres),
            2 => Some(TargetSelector::Both),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_both_resolves_mysql_first() {
        assert_eq!(
            TargetSelector::Both.resolve(),
            vec![DatabaseKind::Mysql, DatabaseKind::Postgres]
        );
        assert_eq!(TargetSelector::Postgres.resolve(), vec![DatabaseKind::Postgres]);
        assert_eq!(TargetSelector::default().resolve(), vec![DatabaseKind::Mysql]);
    }

    #[test]
    fn test_parse_selector() {
        assert_eq!("BOTH".parse::<TargetSelector>(), Ok(TargetSelector::Both));
        assert_eq!("MySQL".parse::<TargetSelector>(), Ok(TargetSelector::Mysql));
        assert_eq!("PostgreSQL".parse::<TargetSelector>(), Ok(TargetSelector::Postgres));
        assert_eq!(
            "sqlite".parse::<TargetSelector>(),
            Err(strum::ParseError::VariantNotFound)
        );
        assert_eq!(TargetSelector::from_index(2), Some(TargetSelector::Both));
        assert_eq!(TargetSelector::from_index(3), None);
    }

    #[test]
    fn test_database_kind_iteration_order() {
        let kinds: Vec<_> = DatabaseKind::iter().map(|k| k.to_string()).collect();
        assert_eq!(kinds, vec!["mysql", "postgres"]);
    }
}
