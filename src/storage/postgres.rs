//! PostgreSQL-family record store.

use async_trait::async_trait;
use log::{debug, error, info};
use sqlx::postgres::{PgArguments, PgPool, PgRow, Postgres};
use sqlx::Row;

use crate::config::{FieldType, RecordSchema};
use crate::error_handling::StoreError;
use crate::storage::backend::RecordStore;
use crate::storage::codec::sql_codec;
use crate::storage::record::{Lookup, Payload, Record};
use crate::storage::sql::{self, Dialect};

/// Record store over a sqlx PostgreSQL pool.
pub struct PgStore {
    pool: PgPool,
    schema: RecordSchema,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: RecordSchema) -> Self {
        PgStore { pool, schema }
    }
}

sql_codec!(Postgres, PgArguments, PgRow);

#[async_trait]
impl RecordStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    async fn install_schema(&self) -> Result<(), StoreError> {
        let ddl = sql::create_table(Dialect::Postgres, &self.schema);
        debug!("postgres: {ddl}");
        sqlx::query(&ddl).execute(&self.pool).await.map_err(|e| {
            error!(
                "Failed to create table {} in PostgreSQL: {e}",
                self.schema.table_name
            );
            StoreError::SqlError(e)
        })?;
        info!("PostgreSQL table {} is ready", self.schema.table_name);
        Ok(())
    }

    async fn create(&self, fields: &Payload) -> Result<Record, StoreError> {
        let stmt = sql::insert(Dialect::Postgres, &self.schema, fields)?;
        let row = prepare(&stmt).fetch_one(&self.pool).await?;
        let id: i64 = row.try_get(0)?;
        Ok(Record::new(Some(id), fields.clone()))
    }

    async fn get(&self, lookup: &Lookup) -> Result<Option<Record>, StoreError> {
        let stmt = sql::select_one(Dialect::Postgres, &self.schema, lookup)?;
        let row = prepare(&stmt).fetch_optional(&self.pool).await?;
        let columns = sql::record_columns(&self.schema);
        Ok(row.map(|r| decode_record(&r, &columns)).transpose()?)
    }

    async fn distinct(&self, fields: &[String]) -> Result<Vec<Record>, StoreError> {
        let stmt = sql::select_distinct(Dialect::Postgres, &self.schema, fields)?;
        let rows = prepare(&stmt).fetch_all(&self.pool).await?;
        let columns: Vec<(String, FieldType)> = fields
            .iter()
            .filter_map(|f| self.schema.field_type(f).map(|t| (f.clone(), t)))
            .collect();
        Ok(rows
            .iter()
            .map(|r| decode_record(r, &columns))
            .collect::<Result<Vec<_>, _>>()?)
    }

    async fn update(&self, record: &Record, only: Option<&[String]>) -> Result<Record, StoreError> {
        if only.is_some_and(|fields| fields.is_empty()) {
            return Ok(record.clone());
        }
        let stmt = sql::update(Dialect::Postgres, &self.schema, record, only)?;
        prepare(&stmt).execute(&self.pool).await?;
        Ok(record.clone())
    }
}
