//! Record schema descriptors.
//!
//! A `RecordSchema` is the table name plus the ordered column declarations a
//! database handle writes to. It is built once from the `model` section of the
//! settings and shared by every request processed in a session.

use std::fmt;
use std::str::FromStr;

use crate::config::constants::{DEFAULT_CHAR_LENGTH, PRIMARY_KEY_COLUMN};

/// Column types a model field can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// Bounded string column (`VARCHAR(n)`).
    Char(u16),
    Text,
    Integer,
    BigInteger,
    Float,
    Double,
    Boolean,
    /// Timestamp without time zone; payload values are RFC 3339 or
    /// `YYYY-MM-DD HH:MM:SS` strings.
    DateTime,
    /// JSON document column.
    Json,
}

impl FieldType {
    /// Short name used in error messages and logs.
    pub fn name(&self) -> &'static str {
        match self {
            FieldType::Char(_) => "char",
            FieldType::Text => "text",
            FieldType::Integer => "integer",
            FieldType::BigInteger => "bigint",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Boolean => "boolean",
            FieldType::DateTime => "datetime",
            FieldType::Json => "json",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Char(len) => write!(f, "char({len})"),
            other => f.write_str(other.name()),
        }
    }
}

impl FromStr for FieldType {
    type Err = strum::ParseError;

    /// Parses `char`, `char(64)`, `varchar`, `text`, `integer`/`int`,
    /// `bigint`, `float`, `double`, `boolean`/`bool`, `datetime`/`timestamp`
    /// and `json`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        if let Some(rest) = lowered
            .strip_prefix("varchar")
            .or_else(|| lowered.strip_prefix("char"))
        {
            if rest.is_empty() {
                return Ok(FieldType::Char(DEFAULT_CHAR_LENGTH));
            }
            let len = rest
                .strip_prefix('(')
                .and_then(|r| r.strip_suffix(')'))
                .and_then(|n| n.trim().parse::<u16>().ok())
                .filter(|n| *n > 0)
                .ok_or(strum::ParseError::VariantNotFound)?;
            return Ok(FieldType::Char(len));
        }
        match lowered.as_str() {
            "text" => Ok(FieldType::Text),
            "integer" | "int" => Ok(FieldType::Integer),
            "bigint" | "biginteger" => Ok(FieldType::BigInteger),
            "float" => Ok(FieldType::Float),
            "double" => Ok(FieldType::Double),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "datetime" | "timestamp" => Ok(FieldType::DateTime),
            "json" => Ok(FieldType::Json),
            _ => Err(strum::ParseError::VariantNotFound),
        }
    }
}

/// One declared column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
}

/// Table name plus ordered field declarations.
///
/// Every table also carries an implicit auto-increment `id` primary key that
/// is never declared here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSchema {
    pub table_name: String,
    pub fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(table_name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        RecordSchema {
            table_name: table_name.into(),
            fields,
        }
    }

    /// Looks up a declared field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_type(&self, name: &str) -> Option<FieldType> {
        if name == PRIMARY_KEY_COLUMN {
            return Some(FieldType::BigInteger);
        }
        self.field(name).map(|f| f.field_type)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}
