//! Reconciliation of crawler callback results against one or two databases.
//!
//! A [`SessionContext`] holds a handle per configured database. Each
//! [`InsertRequest`] or [`UpdateRequest`] names its targets through a
//! [`TargetSelector`]; the engine visits them in order (MySQL before
//! PostgreSQL) and reports what happened on each in an [`Outcome`].

mod engine;
mod filter_cache;
mod outcome;
mod request;
mod session;
mod target;

pub use engine::{process_insert, process_update};
pub use filter_cache::FilterCache;
pub use outcome::{DatabaseAction, DatabaseOutcome, Outcome};
pub use request::{CallbackResult, Filters, InsertRequest, UpdateRequest};
pub use session::{DatabaseHandle, SessionContext};
pub use target::{DatabaseKind, TargetSelector};
