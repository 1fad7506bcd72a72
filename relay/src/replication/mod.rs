//! Replication stream handling.
//!
//! Contains the checksum capability negotiator, the relay event loop, and the
//! SQL-backed catalog client used to enrich the stream with table metadata.

pub mod client;
pub mod negotiate;
pub mod relay;
