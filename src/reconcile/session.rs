//! Session state shared by every request a crawler run processes.

use std::sync::Arc;

use log::info;
use serde_json::Value;

use crate::config::{validate_settings, SessionOptions, Settings};
use crate::error_handling::{RequestKind, SessionError, ValidationError};
use crate::reconcile::engine;
use crate::reconcile::filter_cache::FilterCache;
use crate::reconcile::outcome::Outcome;
use crate::reconcile::request::{CallbackResult, InsertRequest, UpdateRequest};
use crate::reconcile::target::{DatabaseKind, TargetSelector};
use crate::storage::{
    connect_mysql, connect_postgres, MemoryStore, MySqlStore, PgStore, RecordStore,
};

/// One configured database: its record store and its deduplication cache.
pub struct DatabaseHandle {
    kind: DatabaseKind,
    store: Arc<dyn RecordStore>,
    filters: FilterCache,
}

impl DatabaseHandle {
    pub fn new(kind: DatabaseKind, store: Arc<dyn RecordStore>) -> Self {
        DatabaseHandle {
            kind,
            store,
            filters: FilterCache::new(),
        }
    }

    pub fn kind(&self) -> DatabaseKind {
        self.kind
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn filters(&self) -> &FilterCache {
        &self.filters
    }
}

/// The per-run context the engine operates on.
///
/// Holds at most one handle per [`DatabaseKind`]. Share it between
/// concurrently processed requests through an `Arc`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use crawl_sink::reconcile::{DatabaseKind, InsertRequest, SessionContext, TargetSelector};
/// use crawl_sink::storage::{text_schema, MemoryStore};
/// use crawl_sink::SessionOptions;
/// use serde_json::json;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let schema = text_schema("movies", &["title", "url"]);
/// let session = SessionContext::new(SessionOptions::default())
///     .with_store(DatabaseKind::Mysql, Arc::new(MemoryStore::new("mysql", schema)));
///
/// let data = json!({"title": "A", "url": "http://x"}).as_object().cloned().unwrap();
/// let outcome = session
///     .insert(&InsertRequest::new(data).database(TargetSelector::Mysql))
///     .await
///     .unwrap();
/// assert!(outcome.is_success());
/// # }
/// ```
pub struct SessionContext {
    mysql: Option<DatabaseHandle>,
    postgres: Option<DatabaseHandle>,
    options: SessionOptions,
}

impl SessionContext {
    /// A session with no database attached yet.
    pub fn new(options: SessionOptions) -> Self {
        SessionContext {
            mysql: None,
            postgres: None,
            options,
        }
    }

    /// Attaches `store` as the `kind` database, replacing any previous one.
    pub fn with_store(mut self, kind: DatabaseKind, store: Arc<dyn RecordStore>) -> Self {
        let handle = Some(DatabaseHandle::new(kind, store));
        match kind {
            DatabaseKind::Mysql => self.mysql = handle,
            DatabaseKind::Postgres => self.postgres = handle,
        }
        self
    }

    /// Validates `settings`, connects every configured database and installs
    /// the record schemas. The returned session is ready to process requests.
    pub async fn start(settings: &Value, options: SessionOptions) -> Result<Self, SessionError> {
        let settings = validate_settings(settings)?;
        Self::connect(&settings, options).await
    }

    /// Connects the databases described by already validated settings.
    pub async fn connect(settings: &Settings, options: SessionOptions) -> Result<Self, SessionError> {
        let mut session = SessionContext::new(options);
        if let Some(config) = &settings.mysql {
            let pool = connect_mysql(config)
                .await
                .map_err(|source| SessionError::Store {
                    database: DatabaseKind::Mysql.as_str(),
                    source,
                })?;
            session = session.with_store(
                DatabaseKind::Mysql,
                Arc::new(MySqlStore::new(pool, config.schema.clone())),
            );
        }
        if let Some(config) = &settings.postgres {
            let pool = connect_postgres(config)
                .await
                .map_err(|source| SessionError::Store {
                    database: DatabaseKind::Postgres.as_str(),
                    source,
                })?;
            session = session.with_store(
                DatabaseKind::Postgres,
                Arc::new(PgStore::new(pool, config.schema.clone())),
            );
        }
        session.install_schemas().await?;
        Ok(session)
    }

    /// Builds a session over in-memory stores shaped like `settings`.
    ///
    /// Nothing is connected; used for dry runs.
    pub async fn in_memory(settings: &Settings, options: SessionOptions) -> Result<Self, SessionError> {
        let mut session = SessionContext::new(options);
        if let Some(config) = &settings.mysql {
            let store = MemoryStore::new(DatabaseKind::Mysql.as_str(), config.schema.clone());
            session = session.with_store(DatabaseKind::Mysql, Arc::new(store));
        }
        if let Some(config) = &settings.postgres {
            let store = MemoryStore::new(DatabaseKind::Postgres.as_str(), config.schema.clone());
            session = session.with_store(DatabaseKind::Postgres, Arc::new(store));
        }
        session.install_schemas().await?;
        Ok(session)
    }

    /// Creates each attached database's table if it does not exist yet.
    pub async fn install_schemas(&self) -> Result<(), SessionError> {
        for handle in self.handles() {
            handle
                .store
                .install_schema()
                .await
                .map_err(|source| SessionError::Store {
                    database: handle.kind.as_str(),
                    source,
                })?;
            info!(
                "{} store ready (table {})",
                handle.kind,
                handle.store.schema().table_name
            );
        }
        Ok(())
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn handle(&self, kind: DatabaseKind) -> Option<&DatabaseHandle> {
        match kind {
            DatabaseKind::Mysql => self.mysql.as_ref(),
            DatabaseKind::Postgres => self.postgres.as_ref(),
        }
    }

    /// Attached databases in fan-out order.
    pub fn handles(&self) -> impl Iterator<Item = &DatabaseHandle> {
        self.mysql.iter().chain(self.postgres.iter())
    }

    /// Maps a selector to attached handles, failing if any target is missing.
    pub(crate) fn resolve(
        &self,
        kind: RequestKind,
        selector: TargetSelector,
    ) -> Result<Vec<&DatabaseHandle>, ValidationError> {
        selector
            .resolve()
            .into_iter()
            .map(|database| {
                self.handle(database)
                    .ok_or(ValidationError::TargetNotConfigured {
                        kind,
                        database: database.as_str(),
                    })
            })
            .collect()
    }

    pub async fn insert(&self, request: &InsertRequest) -> Result<Outcome, ValidationError> {
        engine::process_insert(self, request).await
    }

    pub async fn update(&self, request: &UpdateRequest) -> Result<Outcome, ValidationError> {
        engine::process_update(self, request).await
    }

    /// Dispatches a callback result to the matching engine operation.
    pub async fn process(&self, result: &CallbackResult) -> Result<Outcome, ValidationError> {
        match result {
            CallbackResult::Insert(request) => self.insert(request).await,
            CallbackResult::Update(request) => self.update(request).await,
        }
    }
}
