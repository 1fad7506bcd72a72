//! Adapter traits for the catalog store and checksum configuration.
//!
//! These traits are the boundary between the relay core and the source
//! database. The production implementation in
//! [`crate::replication::client::MySqlCatalogClient`] queries the server over
//! SQL; tests substitute scripted implementations.

use std::future::Future;
use std::sync::Arc;

use mysql::types::ColumnDescriptor;

use crate::error::RelayResult;

/// Trait for metadata sources that can describe tables by name.
///
/// Failures are fatal to the relay: metadata is required to interpret
/// subsequent row events safely and there is no degraded mode that skips or
/// guesses at column layouts.
pub trait CatalogClient {
    /// Fetches column metadata for the given schema and table name, in
    /// ordinal position order.
    fn query_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = RelayResult<Vec<ColumnDescriptor>>> + Send;
}

/// Trait for reading and aligning the source's binlog checksum setting.
pub trait ChecksumConfig {
    /// Reads the global checksum setting from the source database.
    ///
    /// Implementations surface servers that predate the setting with
    /// [`crate::error::ErrorKind::UnknownSystemVariable`], which callers
    /// treat as "checksums disabled" rather than a failure. Any other error
    /// is fatal.
    fn query_checksum_setting(&self) -> impl Future<Output = RelayResult<String>> + Send;

    /// Aligns the streaming session's checksum expectation with the given
    /// value.
    ///
    /// Failure is fatal: a session streaming with a mismatched checksum
    /// expectation would misparse every subsequent event.
    fn apply_checksum_setting(&self, value: &str) -> impl Future<Output = RelayResult<()>> + Send;
}

impl<C> CatalogClient for Arc<C>
where
    C: CatalogClient,
{
    fn query_columns(
        &self,
        schema: &str,
        table: &str,
    ) -> impl Future<Output = RelayResult<Vec<ColumnDescriptor>>> + Send {
        self.as_ref().query_columns(schema, table)
    }
}

impl<C> ChecksumConfig for Arc<C>
where
    C: ChecksumConfig,
{
    fn query_checksum_setting(&self) -> impl Future<Output = RelayResult<String>> + Send {
        self.as_ref().query_checksum_setting()
    }

    fn apply_checksum_setting(&self, value: &str) -> impl Future<Output = RelayResult<()>> + Send {
        self.as_ref().apply_checksum_setting(value)
    }
}
