use std::collections::HashMap;
use std::sync::Arc;

use mysql::types::{TableDescriptor, TableId};
use tokio::sync::Mutex;

/// Internal storage for schema cache data.
#[derive(Debug, Default)]
struct Inner {
    table_descriptors: HashMap<TableId, Arc<TableDescriptor>>,
}

/// Cache of resolved table metadata keyed by binlog table id.
///
/// [`SchemaCache`] minimizes catalog roundtrips by keeping every descriptor
/// resolved during a replication session. Keying by the numeric table id
/// matches how row events reference tables on the wire, while the fetch that
/// populates an entry uses the human-readable table name, which is what the
/// catalog indexes on.
///
/// The cache has a single writer (the relay's resolution step) and is read by
/// the event producer to decode row events. Entries persist for the lifetime
/// of the relay; a new table-map event for the same id overwrites the entry,
/// last writer wins.
#[derive(Debug, Clone, Default)]
pub struct SchemaCache {
    inner: Arc<Mutex<Inner>>,
}

impl SchemaCache {
    /// Creates a new empty schema cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a table descriptor to the cache.
    ///
    /// An existing descriptor for the same table id is replaced.
    pub async fn add_table_descriptor(&self, descriptor: Arc<TableDescriptor>) {
        let mut inner = self.inner.lock().await;
        inner.table_descriptors.insert(descriptor.id, descriptor);
    }

    /// Retrieves the descriptor for the given table id.
    ///
    /// Returns [`None`] if no descriptor is cached for the table id.
    pub async fn get_table_descriptor(&self, table_id: &TableId) -> Option<Arc<TableDescriptor>> {
        let inner = self.inner.lock().await;
        inner.table_descriptors.get(table_id).cloned()
    }

    /// Returns `true` if a descriptor is cached for the given table id.
    pub async fn contains_table(&self, table_id: &TableId) -> bool {
        let inner = self.inner.lock().await;
        inner.table_descriptors.contains_key(table_id)
    }

    /// Returns the number of cached descriptors.
    pub async fn len(&self) -> usize {
        let inner = self.inner.lock().await;
        inner.table_descriptors.len()
    }

    /// Returns `true` if the cache holds no descriptors.
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
