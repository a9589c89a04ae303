//! Parameter binding and row decoding for the SQL stores.
//!
//! sqlx resolves `bind` and `try_get` against each driver's concrete
//! `Encode`/`Decode` impls, so the helpers are generated once per backend
//! module by `sql_codec!`.

/// Generates `bind_value`, `prepare`, `decode_column` and `decode_record`
/// for one sqlx driver.
macro_rules! sql_codec {
    ($db:ty, $args:ty, $row:ty) => {
        fn bind_value(
            query: ::sqlx::query::Query<'_, $db, $args>,
            value: $crate::storage::sql::SqlValue,
        ) -> ::sqlx::query::Query<'_, $db, $args> {
            use ::chrono::NaiveDateTime;
            use ::sqlx::types::Json;
            use $crate::config::FieldType;
            use $crate::storage::sql::SqlValue;

            match value {
                SqlValue::Null(field_type) => match field_type {
                    FieldType::Char(_) | FieldType::Text => query.bind(None::<String>),
                    FieldType::Integer => query.bind(None::<i32>),
                    FieldType::BigInteger => query.bind(None::<i64>),
                    FieldType::Float => query.bind(None::<f32>),
                    FieldType::Double => query.bind(None::<f64>),
                    FieldType::Boolean => query.bind(None::<bool>),
                    FieldType::DateTime => query.bind(None::<NaiveDateTime>),
                    FieldType::Json => query.bind(None::<Json<::serde_json::Value>>),
                },
                SqlValue::Text(v) => query.bind(v),
                SqlValue::Int(v) => query.bind(v),
                SqlValue::BigInt(v) => query.bind(v),
                SqlValue::Float(v) => query.bind(v),
                SqlValue::Double(v) => query.bind(v),
                SqlValue::Bool(v) => query.bind(v),
                SqlValue::DateTime(v) => query.bind(v),
                SqlValue::Json(v) => query.bind(Json(v)),
            }
        }

        fn prepare(
            stmt: &$crate::storage::sql::Statement,
        ) -> ::sqlx::query::Query<'_, $db, $args> {
            stmt.params
                .iter()
                .fold(::sqlx::query(&stmt.sql), |q, p| bind_value(q, p.value.clone()))
        }

        fn decode_column(
            row: &$row,
            idx: usize,
            field_type: $crate::config::FieldType,
        ) -> Result<$crate::storage::sql::SqlValue, ::sqlx::Error> {
            use ::chrono::NaiveDateTime;
            use ::sqlx::types::Json;
            use ::sqlx::Row;
            use $crate::config::FieldType;
            use $crate::storage::sql::SqlValue;

            let value = match field_type {
                FieldType::Char(_) | FieldType::Text => {
                    row.try_get::<Option<String>, _>(idx)?.map(SqlValue::Text)
                }
                FieldType::Integer => row.try_get::<Option<i32>, _>(idx)?.map(SqlValue::Int),
                FieldType::BigInteger => row.try_get::<Option<i64>, _>(idx)?.map(SqlValue::BigInt),
                FieldType::Float => row.try_get::<Option<f32>, _>(idx)?.map(SqlValue::Float),
                FieldType::Double => row.try_get::<Option<f64>, _>(idx)?.map(SqlValue::Double),
                FieldType::Boolean => row.try_get::<Option<bool>, _>(idx)?.map(SqlValue::Bool),
                FieldType::DateTime => row
                    .try_get::<Option<NaiveDateTime>, _>(idx)?
                    .map(SqlValue::DateTime),
                FieldType::Json => row
                    .try_get::<Option<Json<::serde_json::Value>>, _>(idx)?
                    .map(|j| SqlValue::Json(j.0)),
            };
            Ok(value.unwrap_or(SqlValue::Null(field_type)))
        }

        fn decode_record(
            row: &$row,
            columns: &[(String, $crate::config::FieldType)],
        ) -> Result<$crate::storage::record::Record, ::sqlx::Error> {
            use ::sqlx::Row;
            use $crate::storage::record::{Payload, Record};

            let mut record = Record::new(None, Payload::new());
            for (idx, (name, field_type)) in columns.iter().enumerate() {
                if name == $crate::config::PRIMARY_KEY_COLUMN {
                    record.id = row.try_get::<Option<i64>, _>(idx)?;
                } else {
                    let value = decode_column(row, idx, *field_type)?;
                    record.fields.insert(name.clone(), value.to_json());
                }
            }
            Ok(record)
        }
    };
}

pub(crate) use sql_codec;
