//! The record store abstraction the reconciliation engine writes through.

use async_trait::async_trait;

use crate::config::RecordSchema;
use crate::error_handling::StoreError;
use crate::storage::record::{Lookup, Payload, Record};

/// Asynchronous access to one table of one backing store.
///
/// Every call is a suspension point. Implementations must be safe to share
/// between concurrently processed requests.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Short backend name used in logs (e.g. `"mysql"`).
    fn backend(&self) -> &'static str;

    /// Schema of the table this store writes to.
    fn schema(&self) -> &RecordSchema;

    /// Creates the table if it does not exist. Idempotent.
    async fn install_schema(&self) -> Result<(), StoreError>;

    /// Inserts a record and returns it with its new primary key.
    async fn create(&self, fields: &Payload) -> Result<Record, StoreError>;

    /// Fetches the first record matching `lookup`; `Ok(None)` when nothing matches.
    async fn get(&self, lookup: &Lookup) -> Result<Option<Record>, StoreError>;

    /// Distinct value combinations currently stored for `fields`.
    async fn distinct(&self, fields: &[String]) -> Result<Vec<Record>, StoreError>;

    /// Writes a previously fetched record back by primary key, restricted to
    /// `only` when given.
    async fn update(&self, record: &Record, only: Option<&[String]>) -> Result<Record, StoreError>;
}
