//! MySQL database connection utilities shared across the workspace.
//!
//! This crate provides table identity types, connection configuration and the
//! `information_schema` queries used to enrich binlog events with column
//! metadata. Database access goes through the [`sqlx`] crate.

pub mod replication;
pub mod types;
