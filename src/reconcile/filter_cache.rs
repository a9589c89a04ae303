//! Per-database deduplication cache.
//!
//! For each filter-field set, the cache holds the value tuples already stored
//! in the table, taken from a single distinct-values query the first time the
//! set is used. The snapshot is never refreshed. The lock is only held for
//! map reads and writes, never across a query, so two requests that race on
//! the first use may both run the query; the first result to land is kept.
//!
//! Values are keyed in their column's stored form, so a payload's `"5"` for
//! an integer column matches a stored `5`.

use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use serde_json::{Map, Value};

use crate::config::RecordSchema;
use crate::error_handling::StoreError;
use crate::storage::sql::to_sql_value;
use crate::storage::{Payload, RecordStore};

type ValueKey = String;

#[derive(Default)]
pub struct FilterCache {
    entries: Mutex<HashMap<Vec<String>, HashSet<ValueKey>>>,
}

impl FilterCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Vec<String>, HashSet<ValueKey>>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Whether this filter-field set has been populated.
    pub fn is_populated(&self, fields: &[String]) -> bool {
        self.lock().contains_key(fields)
    }

    /// Returns true when `data`'s values for `fields` are already stored.
    ///
    /// Populates the snapshot for `fields` on first use. A payload missing
    /// any filter field, or holding `null` for one, is never filtered.
    pub async fn contains(
        &self,
        store: &dyn RecordStore,
        fields: &[String],
        data: &Payload,
    ) -> Result<bool, StoreError> {
        let schema = store.schema();
        let Some(key) = value_key(schema, fields, data) else {
            return Ok(false);
        };

        let cached = self.lock().get(fields).map(|values| values.contains(&key));
        if let Some(hit) = cached {
            return Ok(hit);
        }

        let rows = store.distinct(fields).await?;
        let snapshot: HashSet<ValueKey> = rows
            .iter()
            .filter_map(|row| value_key(schema, fields, &row.fields))
            .collect();
        debug!(
            "{}: cached {} distinct value(s) for filter {:?}",
            store.backend(),
            snapshot.len(),
            fields
        );

        let mut entries = self.lock();
        let values = entries.entry(fields.to_vec()).or_insert(snapshot);
        Ok(values.contains(&key))
    }

    /// Adds `data`'s values for `fields` to an already populated snapshot.
    pub fn remember(&self, schema: &RecordSchema, fields: &[String], data: &Payload) {
        let Some(key) = value_key(schema, fields, data) else {
            return;
        };
        if let Some(values) = self.lock().get_mut(fields) {
            values.insert(key);
        }
    }
}

/// A value that cannot be stored in its column yields no key.
fn value_key(schema: &RecordSchema, fields: &[String], data: &Payload) -> Option<ValueKey> {
    let values = fields
        .iter()
        .map(|field| {
            let value = data.get(field).filter(|v| !v.is_null())?;
            match schema.field_type(field) {
                Some(field_type) => to_sql_value(field, field_type, value)
                    .ok()
                    .map(|v| sorted_keys(v.to_json())),
                None => Some(sorted_keys(value.clone())),
            }
        })
        .collect::<Option<Vec<Value>>>()?;
    Some(Value::Array(values).to_string())
}

// JSON columns may hand objects back in a different key order.
fn sorted_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|a, b| a.0.cmp(&b.0));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, sorted_keys(v)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sorted_keys).collect()),
        other => other,
    }
}
