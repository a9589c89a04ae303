//! Stored record and lookup types.
//!
//! Payloads travel through the engine as ordered JSON objects; a `Record` is
//! one stored row (primary key plus columns) and a `Lookup` selects a single
//! row for the update path.

mod types;

pub use types::{Lookup, Operator, Payload, Predicate, Record};
