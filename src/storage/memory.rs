//! In-process record store.
//!
//! Keeps rows in memory and counts every call made through the
//! [`RecordStore`] interface. Used by the batch runner's `--dry-run` mode and
//! by tests, which can also simulate an unreachable backend.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::{FieldType, RecordSchema, PRIMARY_KEY_COLUMN};
use crate::error_handling::StoreError;
use crate::storage::backend::RecordStore;
use crate::storage::record::{Lookup, Payload, Record};
use crate::storage::sql::to_sql_value;

/// Snapshot of how often each store operation was invoked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub install_schema: usize,
    pub create: usize,
    pub get: usize,
    pub distinct: usize,
    pub update: usize,
}

#[derive(Default)]
struct Counters {
    install_schema: AtomicUsize,
    create: AtomicUsize,
    get: AtomicUsize,
    distinct: AtomicUsize,
    update: AtomicUsize,
}

/// Record store backed by a `Vec` behind a mutex.
pub struct MemoryStore {
    backend: &'static str,
    schema: RecordSchema,
    rows: Mutex<Vec<Record>>,
    next_id: AtomicI64,
    counters: Counters,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store that reports itself as `backend` in logs.
    pub fn new(backend: &'static str, schema: RecordSchema) -> Self {
        MemoryStore {
            backend,
            schema,
            rows: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            counters: Counters::default(),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Makes every subsequent operation fail with [`StoreError::Unavailable`].
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Stores a row without counting it as a `create` call.
    pub fn seed(&self, fields: Payload) -> Record {
        let record = Record::new(Some(self.next_id.fetch_add(1, Ordering::SeqCst)), fields);
        self.lock_rows().push(record.clone());
        record
    }

    /// All stored rows in insertion order.
    pub fn rows(&self) -> Vec<Record> {
        self.lock_rows().clone()
    }

    pub fn calls(&self) -> CallCounts {
        CallCounts {
            install_schema: self.counters.install_schema.load(Ordering::SeqCst),
            create: self.counters.create.load(Ordering::SeqCst),
            get: self.counters.get.load(Ordering::SeqCst),
            distinct: self.counters.distinct.load(Ordering::SeqCst),
            update: self.counters.update.load(Ordering::SeqCst),
        }
    }

    fn lock_rows(&self) -> std::sync::MutexGuard<'_, Vec<Record>> {
        // A panic while holding the lock cannot leave rows half-written.
        self.rows.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable(format!(
                "{} store is unavailable",
                self.backend
            )));
        }
        Ok(())
    }

    /// Applies the same field and type checks a SQL backend would.
    fn check_field(&self, field: &str, value: &Value) -> Result<(), StoreError> {
        let field_type = self
            .schema
            .field_type(field)
            .ok_or_else(|| StoreError::UnknownField {
                table: self.schema.table_name.clone(),
                field: field.to_string(),
            })?;
        to_sql_value(field, field_type, value).map(|_| ())
    }

    fn full_row(&self, id: i64, fields: &Payload) -> Record {
        let mut row = Payload::new();
        for name in self.schema.field_names() {
            row.insert(
                name.to_string(),
                fields.get(name).cloned().unwrap_or(Value::Null),
            );
        }
        Record::new(Some(id), row)
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        self.backend
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    async fn install_schema(&self) -> Result<(), StoreError> {
        self.counters.install_schema.fetch_add(1, Ordering::SeqCst);
        self.check_available()
    }

    async fn create(&self, fields: &Payload) -> Result<Record, StoreError> {
        self.counters.create.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_available()?;
        for (field, value) in fields {
            self.check_field(field, value)?;
        }
        let id = match fields.get(PRIMARY_KEY_COLUMN).and_then(Value::as_i64) {
            Some(id) => id,
            None => self.next_id.fetch_add(1, Ordering::SeqCst),
        };
        self.lock_rows().push(self.full_row(id, fields));
        Ok(Record::new(Some(id), fields.clone()))
    }

    async fn get(&self, lookup: &Lookup) -> Result<Option<Record>, StoreError> {
        self.counters.get.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_available()?;
        for predicate in lookup.predicates() {
            if self.schema.field_type(&predicate.field).is_none() {
                return Err(StoreError::UnknownField {
                    table: self.schema.table_name.clone(),
                    field: predicate.field,
                });
            }
        }
        Ok(self
            .lock_rows()
            .iter()
            .find(|row| lookup.matches(row))
            .cloned())
    }

    async fn distinct(&self, fields: &[String]) -> Result<Vec<Record>, StoreError> {
        self.counters.distinct.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_available()?;
        for field in fields {
            self.check_field(field, &Value::Null)?;
        }

        let rows = self.lock_rows();
        let mut seen = HashSet::new();
        let mut distinct = Vec::new();
        for row in rows.iter() {
            let mut projected = Payload::new();
            for field in fields {
                projected.insert(
                    field.clone(),
                    row.get(field).cloned().unwrap_or(Value::Null),
                );
            }
            if seen.insert(Value::Object(projected.clone()).to_string()) {
                distinct.push(Record::new(None, projected));
            }
        }
        Ok(distinct)
    }

    async fn update(&self, record: &Record, only: Option<&[String]>) -> Result<Record, StoreError> {
        self.counters.update.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        self.check_available()?;
        let id = record
            .id
            .ok_or_else(|| StoreError::MissingPrimaryKey(self.schema.table_name.clone()))?;

        let columns: Vec<String> = match only {
            Some(only) => only.to_vec(),
            None => record.fields.keys().cloned().collect(),
        };
        for column in &columns {
            self.check_field(column, record.get(column).unwrap_or(&Value::Null))?;
        }

        let mut rows = self.lock_rows();
        if let Some(row) = rows.iter_mut().find(|r| r.id == Some(id)) {
            for column in columns {
                let value = record.get(&column).cloned().unwrap_or(Value::Null);
                row.fields.insert(column, value);
            }
        }
        Ok(record.clone())
    }
}

/// Schema whose fields are all `TEXT`.
pub fn text_schema(table_name: &str, fields: &[&str]) -> RecordSchema {
    RecordSchema::new(
        table_name,
        fields
            .iter()
            .map(|name| crate::config::FieldDef {
                name: name.to_string(),
                field_type: FieldType::Text,
            })
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let store = MemoryStore::new("mysql", text_schema("movies", &["title", "url"]));
        let created = store
            .create(&payload(json!({"title": "A", "url": "http://x"})))
            .await
            .unwrap();
        assert_eq!(created.id, Some(1));

        let found = store
            .get(&Lookup::Fields(payload(json!({"title": "A"}))))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(found.get("url"), Some(&json!("http://x")));
        assert!(store
            .get(&Lookup::Fields(payload(json!({"title": "B"}))))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.calls().create, 1);
        assert_eq!(store.calls().get, 2);
    }

    #[tokio::test]
    async fn test_unknown_field_is_rejected() {
        let store = MemoryStore::new("mysql", text_schema("movies", &["title"]));
        let err = store
            .create(&payload(json!({"director": "X"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownField { .. }));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn test_distinct_projects_and_dedups() {
        let store = MemoryStore::new("postgres", text_schema("movies", &["title", "url"]));
        store.seed(payload(json!({"title": "A", "url": "http://x"})));
        store.seed(payload(json!({"title": "B", "url": "http://x"})));
        store.seed(payload(json!({"title": "C", "url": "http://y"})));

        let urls = store.distinct(&["url".to_string()]).await.unwrap();
        assert_eq!(urls.len(), 2);
        assert!(urls.iter().all(|r| r.id.is_none()));
        assert_eq!(store.calls().distinct, 1);
    }

    #[tokio::test]
    async fn test_update_only_fields() {
        let store = MemoryStore::new("mysql", text_schema("movies", &["title", "url"]));
        let seeded = store.seed(payload(json!({"title": "A", "url": "http://x"})));

        let mut record = seeded.clone();
        record.merge(&payload(json!({"title": "Z", "url": "http://y"})));
        store
            .update(&record, Some(&["url".to_string()]))
            .await
            .unwrap();

        let row = &store.rows()[0];
        assert_eq!(row.get("url"), Some(&json!("http://y")));
        assert_eq!(row.get("title"), Some(&json!("A")));
    }

    #[tokio::test]
    async fn test_unavailable_store() {
        let store = MemoryStore::new("mysql", text_schema("movies", &["title"]));
        store.set_unavailable(true);
        let err = store
            .create(&payload(json!({"title": "A"})))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
        assert_eq!(store.calls().create, 1);

        store.set_unavailable(false);
        assert!(store.create(&payload(json!({"title": "A"}))).await.is_ok());
    }
}
