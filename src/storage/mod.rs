//! Record stores.
//!
//! The reconciliation engine talks to every backing database through the
//! [`RecordStore`] trait. Two SQL implementations share a statement builder
//! ([`sql`]) and the generated binding and decoding helpers in `codec`; they
//! differ in dialect and in how a new primary key is read back.
//! [`MemoryStore`] serves dry runs and tests.

pub mod backend;
mod codec;
pub mod memory;
pub mod mysql;
pub mod pool;
pub mod postgres;
pub mod record;
pub mod sql;

pub use backend::RecordStore;
pub use memory::{text_schema, CallCounts, MemoryStore};
pub use mysql::MySqlStore;
pub use pool::{connect_mysql, connect_postgres};
pub use postgres::PgStore;
pub use record::{Lookup, Operator, Payload, Predicate, Record};
pub use sql::Dialect;
