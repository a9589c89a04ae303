//! MySQL-family record store.

use async_trait::async_trait;
use log::{debug, error, info};
use sqlx::mysql::{MySql, MySqlArguments, MySqlPool, MySqlRow};

use crate::config::{FieldType, RecordSchema};
use crate::error_handling::StoreError;
use crate::storage::backend::RecordStore;
use crate::storage::codec::sql_codec;
use crate::storage::record::{Lookup, Payload, Record};
use crate::storage::sql::{self, Dialect};

/// Record store over a sqlx MySQL pool.
pub struct MySqlStore {
    pool: MySqlPool,
    schema: RecordSchema,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool, schema: RecordSchema) -> Self {
        MySqlStore { pool, schema }
    }
}

sql_codec!(MySql, MySqlArguments, MySqlRow);

#[async_trait]
impl RecordStore for MySqlStore {
    fn backend(&self) -> &'static str {
        "mysql"
    }

    fn schema(&self) -> &RecordSchema {
        &self.schema
    }

    async fn install_schema(&self) -> Result<(), StoreError> {
        let ddl = sql::create_table(Dialect::MySql, &self.schema);
        debug!("mysql: {ddl}");
        sqlx::query(&ddl).execute(&self.pool).await.map_err(|e| {
            error!(
                "Failed to create table {} in MySQL: {e}",
                self.schema.table_name
            );
            StoreError::SqlError(e)
        })?;
        info!("MySQL table {} is ready", self.schema.table_name);
        Ok(())
    }

    async fn create(&self, fields: &Payload) -> Result<Record, StoreError> {
        let stmt = sql::insert(Dialect::MySql, &self.schema, fields)?;
        let result = prepare(&stmt).execute(&self.pool).await?;
        // AUTO_INCREMENT keys fit in a signed BIGINT column
        let id = result.last_insert_id() as i64;
        Ok(Record::new(Some(id), fields.clone()))
    }

    async fn get(&self, lookup: &Lookup) -> Result<Option<Record>, StoreError> {
        let stmt = sql::select_one(Dialect::MySql, &self.schema, lookup)?;
        let row = prepare(&stmt).fetch_optional(&self.pool).await?;
        let columns = sql::record_columns(&self.schema);
        Ok(row.map(|r| decode_record(&r, &columns)).transpose()?)
    }

    async fn distinct(&self, fields: &[String]) -> Result<Vec<Record>, StoreError> {
        let stmt = sql::select_distinct(Dialect::MySql, &self.schema, fields)?;
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
        let stmt = sql::update(Dialect::MySql, &self.schema, record, only)?;
        prepare(&stmt).execute(&self.pool).await?;
        Ok(record.clone())
    }
}
