//! SQL statement generation for the two supported dialects.
//!
//! Table and column names come from a validated [`RecordSchema`] and are
//! quoted per dialect; every value is passed as a bound parameter. Payload
//! values are converted to typed [`SqlValue`]s according to the declared
//! column type before binding.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::{Number, Value};

use crate::config::{FieldType, RecordSchema, PRIMARY_KEY_COLUMN};
use crate::error_handling::StoreError;
use crate::storage::record::{Lookup, Operator, Payload, Record};

/// SQL flavor of a backing store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    MySql,
    Postgres,
}

impl Dialect {
    pub fn quote(&self, ident: &str) -> String {
        match self {
            Dialect::MySql => format!("`{ident}`"),
            Dialect::Postgres => format!("\"{ident}\""),
        }
    }

    /// Placeholder for the `n`th (1-based) bound parameter.
    pub fn placeholder(&self, n: usize) -> String {
        match self {
            Dialect::MySql => "?".to_string(),
            Dialect::Postgres => format!("${n}"),
        }
    }

    pub fn column_type(&self, field_type: FieldType) -> String {
        match (self, field_type) {
            (_, FieldType::Char(len)) => format!("VARCHAR({len})"),
            (_, FieldType::Text) => "TEXT".to_string(),
            (_, FieldType::Integer) => "INTEGER".to_string(),
            (_, FieldType::BigInteger) => "BIGINT".to_string(),
            (Dialect::MySql, FieldType::Float) => "FLOAT".to_string(),
            (Dialect::Postgres, FieldType::Float) => "REAL".to_string(),
            (Dialect::MySql, FieldType::Double) => "DOUBLE".to_string(),
            (Dialect::Postgres, FieldType::Double) => "DOUBLE PRECISION".to_string(),
            (Dialect::MySql, FieldType::Boolean) => "BOOL".to_string(),
            (Dialect::Postgres, FieldType::Boolean) => "BOOLEAN".to_string(),
            (Dialect::MySql, FieldType::DateTime) => "DATETIME(6)".to_string(),
            (Dialect::Postgres, FieldType::DateTime) => "TIMESTAMP".to_string(),
            (Dialect::MySql, FieldType::Json) => "JSON".to_string(),
            (Dialect::Postgres, FieldType::Json) => "JSONB".to_string(),
        }
    }

    fn primary_key(&self) -> String {
        match self {
            Dialect::MySql => format!(
                "{} BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY",
                self.quote(PRIMARY_KEY_COLUMN)
            ),
            Dialect::Postgres => format!("{} BIGSERIAL PRIMARY KEY", self.quote(PRIMARY_KEY_COLUMN)),
        }
    }
}

/// A payload value converted to the Rust type its column expects.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    /// Typed `NULL`; the type picks the bind type.
    Null(FieldType),
    Text(String),
    Int(i32),
    BigInt(i64),
    Float(f32),
    Double(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
    Json(Value),
}

impl SqlValue {
    /// The value as it reads back from its column.
    ///
    /// Payload values and decoded rows both pass through here, so two inputs
    /// the database stores identically render to the same JSON.
    pub fn to_json(&self) -> Value {
        match self {
            SqlValue::Null(_) => Value::Null,
            SqlValue::Text(v) => Value::String(v.clone()),
            SqlValue::Int(v) => Value::from(*v),
            SqlValue::BigInt(v) => Value::from(*v),
            SqlValue::Float(v) => Number::from_f64(f64::from(*v)).map_or(Value::Null, Value::Number),
            SqlValue::Double(v) => Number::from_f64(*v).map_or(Value::Null, Value::Number),
            SqlValue::Bool(v) => Value::Bool(*v),
            SqlValue::DateTime(v) => Value::String(format_datetime(v)),
            SqlValue::Json(v) => v.clone(),
        }
    }
}

/// A bound parameter: the column it targets plus its converted value.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub column: String,
    pub value: SqlValue,
}

/// SQL text plus its parameters in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<Param>,
}

fn bind_error(column: &str, field_type: FieldType, value: &Value) -> StoreError {
    StoreError::Bind {
        column: column.to_string(),
        reason: format!("{value} is not a valid {}", field_type.name()),
    }
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Converts a JSON payload value into the bind type of `field_type`.
///
/// Lenient where the conversion is lossless: numeric strings bind to numeric
/// columns, scalars bind to text columns, `0`/`1` bind to booleans and unix
/// timestamps bind to datetime columns.
pub fn to_sql_value(column: &str, field_type: FieldType, value: &Value) -> Result<SqlValue, StoreError> {
    if value.is_null() {
        return Ok(SqlValue::Null(field_type));
    }
    let err = || bind_error(column, field_type, value);

    let converted = match field_type {
        FieldType::Char(len) => {
            let text = match value {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            if text.chars().count() > usize::from(len) {
                return Err(StoreError::Bind {
                    column: column.to_string(),
                    reason: format!("value longer than {len} characters"),
                });
            }
            SqlValue::Text(text)
        }
        FieldType::Text => SqlValue::Text(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }),
        FieldType::Integer => {
            let n = as_i64(value).ok_or_else(err)?;
            SqlValue::Int(i32::try_from(n).map_err(|_| err())?)
        }
        FieldType::BigInteger => SqlValue::BigInt(as_i64(value).ok_or_else(err)?),
        FieldType::Float => SqlValue::Float(as_f64(value).ok_or_else(err)? as f32),
        FieldType::Double => SqlValue::Double(as_f64(value).ok_or_else(err)?),
        FieldType::Boolean => SqlValue::Bool(match value {
            Value::Bool(b) => *b,
            Value::Number(n) if n.as_i64() == Some(0) => false,
            Value::Number(n) if n.as_i64() == Some(1) => true,
            Value::String(s) if s.eq_ignore_ascii_case("true") => true,
            Value::String(s) if s.eq_ignore_ascii_case("false") => false,
            _ => return Err(err()),
        }),
        FieldType::DateTime => SqlValue::DateTime(match value {
            Value::String(s) => parse_datetime(s).ok_or_else(err)?,
            Value::Number(n) => n
                .as_i64()
                .and_then(|secs| DateTime::from_timestamp(secs, 0))
                .map(|dt| dt.naive_utc())
                .ok_or_else(err)?,
            _ => return Err(err()),
        }),
        FieldType::Json => SqlValue::Json(value.clone()),
    };
    Ok(converted)
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Formats a decoded timestamp the way payload datetimes are accepted.
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%d %H:%M:%S%.f").to_string()
}

fn column_type_of(schema: &RecordSchema, field: &str) -> Result<FieldType, StoreError> {
    schema
        .field_type(field)
        .ok_or_else(|| StoreError::UnknownField {
            table: schema.table_name.clone(),
            field: field.to_string(),
        })
}

fn param(schema: &RecordSchema, field: &str, value: &Value) -> Result<Param, StoreError> {
    let field_type = column_type_of(schema, field)?;
    Ok(Param {
        column: field.to_string(),
        value: to_sql_value(field, field_type, value)?,
    })
}

/// Columns read back for full records: the primary key then every declared field.
pub fn record_columns(schema: &RecordSchema) -> Vec<(String, FieldType)> {
    std::iter::once((PRIMARY_KEY_COLUMN.to_string(), FieldType::BigInteger))
        .chain(
            schema
                .fields
                .iter()
                .map(|f| (f.name.clone(), f.field_type)),
        )
        .collect()
}

/// `CREATE TABLE IF NOT EXISTS` for the schema. Declared columns are nullable.
pub fn create_table(dialect: Dialect, schema: &RecordSchema) -> String {
    let mut columns = vec![dialect.primary_key()];
    columns.extend(schema.fields.iter().map(|f| {
        format!(
            "{} {} NULL",
            dialect.quote(&f.name),
            dialect.column_type(f.field_type)
        )
    }));
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        dialect.quote(&schema.table_name),
        columns.join(", ")
    )
}

/// `INSERT` of every payload field. PostgreSQL returns the new primary key.
pub fn insert(dialect: Dialect, schema: &RecordSchema, fields: &Payload) -> Result<Statement, StoreError> {
    let params = fields
        .iter()
        .map(|(field, value)| param(schema, field, value))
        .collect::<Result<Vec<_>, _>>()?;

    let table = dialect.quote(&schema.table_name);
    let mut sql = if params.is_empty() {
        match dialect {
            Dialect::MySql => format!("INSERT INTO {table} () VALUES ()"),
            Dialect::Postgres => format!("INSERT INTO {table} DEFAULT VALUES"),
        }
    } else {
        let columns: Vec<String> = params.iter().map(|p| dialect.quote(&p.column)).collect();
        let placeholders: Vec<String> = (1..=params.len()).map(|n| dialect.placeholder(n)).collect();
        format!(
            "INSERT INTO {table} ({}) VALUES ({})",
            columns.join(", "),
            placeholders.join(", ")
        )
    };
    if dialect == Dialect::Postgres {
        sql.push_str(&format!(" RETURNING {}", dialect.quote(PRIMARY_KEY_COLUMN)));
    }

    Ok(Statement { sql, params })
}

/// `SELECT` of the first record matching `lookup`.
pub fn select_one(dialect: Dialect, schema: &RecordSchema, lookup: &Lookup) -> Result<Statement, StoreError> {
    let columns: Vec<String> = record_columns(schema)
        .iter()
        .map(|(name, _)| dialect.quote(name))
        .collect();

    let mut params = Vec::new();
    let mut conditions = Vec::new();
    for predicate in lookup.predicates() {
        let column = dialect.quote(&predicate.field);
        if predicate.op.takes_value() && !predicate.value.is_null() {
            let field_type = column_type_of(schema, &predicate.field)?;
            // LIKE patterns are always text.
            let field_type = if predicate.op == Operator::Like {
                FieldType::Text
            } else {
                field_type
            };
            params.push(Param {
                column: predicate.field.clone(),
                value: to_sql_value(&predicate.field, field_type, &predicate.value)?,
            });
            conditions.push(format!(
                "{column} {} {}",
                predicate.op.sql(),
                dialect.placeholder(params.len())
            ));
        } else {
            column_type_of(schema, &predicate.field)?;
            let op = match predicate.op {
                Operator::Ne | Operator::NotNull => Operator::NotNull,
                _ => Operator::IsNull,
            };
            conditions.push(format!("{column} {}", op.sql()));
        }
    }

    let mut sql = format!(
        "SELECT {} FROM {}",
        columns.join(", "),
        dialect.quote(&schema.table_name)
    );
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions.join(" AND "));
    }
    sql.push_str(&format!(" ORDER BY {} LIMIT 1", dialect.quote(PRIMARY_KEY_COLUMN)));

    Ok(Statement { sql, params })
}

/// `SELECT DISTINCT` over the given fields.
pub fn select_distinct(dialect: Dialect, schema: &RecordSchema, fields: &[String]) -> Result<Statement, StoreError> {
    let columns = fields
        .iter()
        .map(|f| column_type_of(schema, f).map(|_| dialect.quote(f)))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Statement {
        sql: format!(
            "SELECT DISTINCT {} FROM {}",
            columns.join(", "),
            dialect.quote(&schema.table_name)
        ),
        params: Vec::new(),
    })
}

/// `UPDATE` of a fetched record by primary key.
///
/// Writes the fields named in `only`, or every field the record carries.
pub fn update(
    dialect: Dialect,
    schema: &RecordSchema,
    record: &Record,
    only: Option<&[String]>,
) -> Result<Statement, StoreError> {
    let id = record
        .id
        .ok_or_else(|| StoreError::MissingPrimaryKey(schema.table_name.clone()))?;

    let columns: Vec<String> = match only {
        Some(only) => only.to_vec(),
        None => record
            .fields
            .keys()
            .filter(|k| k.as_str() != PRIMARY_KEY_COLUMN)
            .cloned()
            .collect(),
    };

    let mut params = Vec::with_capacity(columns.len() + 1);
    let mut assignments = Vec::with_capacity(columns.len());
    for column in &columns {
        let value = record.fields.get(column).unwrap_or(&Value::Null);
        params.push(param(schema, column, value)?);
        assignments.push(format!(
            "{} = {}",
            dialect.quote(column),
            dialect.placeholder(params.len())
        ));
    }
    params.push(Param {
        column: PRIMARY_KEY_COLUMN.to_string(),
        value: SqlValue::BigInt(id),
    });

    Ok(Statement {
        sql: format!(
            "UPDATE {} SET {} WHERE {} = {}",
            dialect.quote(&schema.table_name),
            assignments.join(", "),
            dialect.quote(PRIMARY_KEY_COLUMN),
            dialect.placeholder(params.len())
        ),
        params,
    })
}
