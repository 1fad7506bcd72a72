//! Core event relay for MySQL binlog change-data-capture.
//!
//! The relay attaches to a source server's binary replication stream,
//! negotiates checksum capabilities, lazily resolves table metadata from the
//! catalog, and re-emits a schema-enriched event sequence to subscribers in
//! strict arrival order.

pub mod catalog;
pub mod client;
pub mod concurrency;
pub mod error;
mod macros;
pub mod replication;
pub mod schema;
pub mod source;
pub mod types;
