//! crawl_sink library: persist crawler callback results into MySQL and/or PostgreSQL
//!
//! A crawler yields one callback result per scraped item. This library turns
//! each result into inserts or lookups-then-updates against one or both
//! configured databases, optionally skipping values that are already stored.
//!
//! # Example
//!
//! ```no_run
//! use crawl_sink::reconcile::{InsertRequest, SessionContext, TargetSelector};
//! use crawl_sink::SessionOptions;
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let settings = json!({
//!     "mysql": {
//!         "host": "127.0.0.1",
//!         "user": "crawler",
//!         "password": "secret",
//!         "database": "crawl",
//!         "model": { "table_name": "movies", "title": "char", "url": "char" }
//!     },
//!     "postgres": {
//!         "host": "127.0.0.1",
//!         "user": "crawler",
//!         "password": "secret",
//!         "database": "crawl",
//!         "model": { "table_name": "movies", "title": "char", "url": "char" }
//!     }
//! });
//! let session = SessionContext::start(&settings, SessionOptions::default()).await?;
//!
//! let data = json!({"title": "A", "url": "http://x"}).as_object().cloned().unwrap_or_default();
//! let request = InsertRequest::new(data)
//!     .database(TargetSelector::Both)
//!     .filters("url");
//! let outcome = session.insert(&request).await?;
//! println!("{}", outcome.message);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime.

mod app;
pub mod config;
pub mod error_handling;
pub mod initialization;
pub mod reconcile;
pub mod run;
pub mod storage;

// Re-export public API
pub use config::{validate_settings, Config, LogFormat, LogLevel, SessionOptions, Settings};
pub use error_handling::{ConfigError, SessionError, StoreError, ValidationError};
pub use reconcile::{
    CallbackResult, InsertRequest, Outcome, SessionContext, TargetSelector, UpdateRequest,
};
pub use run::{run_batch, BatchReport};
