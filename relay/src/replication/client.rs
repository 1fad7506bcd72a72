use mysql::replication::checksum::{apply_binlog_checksum, fetch_binlog_checksum};
use mysql::replication::db::{MySqlConnectionConfig, connect_to_source_database};
use mysql::replication::schema::get_table_columns;
use mysql::types::{ColumnDescriptor, TableName};
use sqlx::MySqlPool;
use tracing::info;

use crate::catalog::{CatalogClient, ChecksumConfig};
use crate::error::{ErrorKind, RelayResult};
use crate::relay_error;

/// Connection limits for the control pool.
///
/// Catalog lookups are serialized by the relay's pause/resume protocol, so a
/// small pool is sufficient.
const CONTROL_MIN_CONNECTIONS: u32 = 1;
const CONTROL_MAX_CONNECTIONS: u32 = 2;

/// SQL-backed implementation of the catalog and checksum adapters.
///
/// Holds two connection pools: a control pool for catalog and global variable
/// queries, and a streaming pool whose single session is the one the binlog
/// producer dumps on. The streaming pool is capped at one connection because
/// the checksum alignment sets a session-scoped variable that must land on
/// the exact session issuing the dump.
#[derive(Debug, Clone)]
pub struct MySqlCatalogClient {
    control_pool: MySqlPool,
    stream_pool: MySqlPool,
}

impl MySqlCatalogClient {
    /// Connects the control and streaming pools.
    ///
    /// The two configs usually point at the same server; the control
    /// connection typically selects `information_schema` while the streaming
    /// connection targets the endpoint the binlog dump is issued against.
    pub async fn connect(
        control: &MySqlConnectionConfig,
        streaming: &MySqlConnectionConfig,
    ) -> RelayResult<Self> {
        info!(
            "connecting control session to {}:{}",
            control.host, control.port
        );
        let control_pool = connect_to_source_database(
            control,
            CONTROL_MIN_CONNECTIONS,
            CONTROL_MAX_CONNECTIONS,
        )
        .await?;

        info!(
            "connecting streaming session to {}:{}",
            streaming.host, streaming.port
        );
        let stream_pool = connect_to_source_database(streaming, 1, 1).await?;

        Ok(Self {
            control_pool,
            stream_pool,
        })
    }

    /// Returns the pool holding the streaming session.
    ///
    /// Producers use this to issue the binlog dump on the session whose
    /// checksum expectation was aligned during negotiation.
    pub fn stream_pool(&self) -> &MySqlPool {
        &self.stream_pool
    }
}

impl CatalogClient for MySqlCatalogClient {
    async fn query_columns(&self, schema: &str, table: &str) -> RelayResult<Vec<ColumnDescriptor>> {
        let table_name = TableName::new(schema.to_string(), table.to_string());
        let columns = get_table_columns(&self.control_pool, &table_name).await?;

        Ok(columns)
    }
}

impl ChecksumConfig for MySqlCatalogClient {
    async fn query_checksum_setting(&self) -> RelayResult<String> {
        let value = fetch_binlog_checksum(&self.control_pool).await?;

        Ok(value)
    }

    async fn apply_checksum_setting(&self, value: &str) -> RelayResult<()> {
        apply_binlog_checksum(&self.stream_pool, value)
            .await
            .map_err(|err| {
                relay_error!(
                    ErrorKind::ChecksumAlignmentFailed,
                    "Failed to align the streaming session checksum",
                    detail = err.to_string(),
                    source: err
                )
            })
    }
}
