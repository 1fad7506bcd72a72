use std::sync::Arc;

use mysql::types::{TableDescriptor, TableId, TableName};
use tracing::debug;

use crate::bail;
use crate::catalog::CatalogClient;
use crate::error::{ErrorKind, RelayResult};
use crate::schema::cache::SchemaCache;

/// Resolves table descriptors on demand, caching them by table id.
///
/// Resolution is serialized by the relay's pause/resume protocol: the event
/// loop never starts a second resolution while one is outstanding, so the
/// cache has exactly one writer.
#[derive(Debug, Clone)]
pub struct SchemaResolver<C> {
    catalog: Arc<C>,
    cache: SchemaCache,
}

impl<C> SchemaResolver<C>
where
    C: CatalogClient,
{
    /// Creates a resolver over the given catalog and cache.
    pub fn new(catalog: Arc<C>, cache: SchemaCache) -> Self {
        Self { catalog, cache }
    }

    /// Returns the cached descriptor for the table id, if any.
    pub async fn cached(&self, table_id: &TableId) -> Option<Arc<TableDescriptor>> {
        self.cache.get_table_descriptor(table_id).await
    }

    /// Resolves the descriptor for a table, serving repeated resolutions from
    /// the cache.
    ///
    /// A cache hit returns immediately with no I/O. A miss fetches from the
    /// catalog, caches the result, and returns it.
    pub async fn resolve(
        &self,
        table_id: TableId,
        table_name: &TableName,
        wire_types: &[u8],
    ) -> RelayResult<Arc<TableDescriptor>> {
        if let Some(descriptor) = self.cache.get_table_descriptor(&table_id).await {
            return Ok(descriptor);
        }

        self.refresh(table_id, table_name, wire_types).await
    }

    /// Fetches a fresh descriptor from the catalog and overwrites the cache
    /// entry for the table id.
    ///
    /// Used both for first-time resolution and when a table-map event shows a
    /// wire layout that no longer matches the cached descriptor (the table
    /// was redefined). Last writer wins.
    pub async fn refresh(
        &self,
        table_id: TableId,
        table_name: &TableName,
        wire_types: &[u8],
    ) -> RelayResult<Arc<TableDescriptor>> {
        debug!(
            "resolving schema for table {} (id {})",
            table_name, table_id
        );

        let columns = self
            .catalog
            .query_columns(&table_name.schema, &table_name.name)
            .await?;

        // The catalog row count must line up with the wire layout, otherwise
        // positional enrichment would associate values with the wrong columns.
        if columns.len() != wire_types.len() {
            bail!(
                ErrorKind::SourceSchemaError,
                "Catalog column count does not match the wire layout",
                format!(
                    "table {} reports {} columns in the catalog but {} on the wire",
                    table_name,
                    columns.len(),
                    wire_types.len()
                )
            );
        }

        let descriptor = Arc::new(TableDescriptor::new(
            table_id,
            table_name.clone(),
            columns,
            wire_types.to_vec(),
        ));
        self.cache.add_table_descriptor(descriptor.clone()).await;

        Ok(descriptor)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use mysql::types::ColumnDescriptor;

    use super::*;
    use crate::error::RelayError;
    use crate::relay_error;

    /// Catalog stub that counts queries and serves a fixed column set.
    struct CountingCatalog {
        columns: Vec<ColumnDescriptor>,
        queries: Mutex<u32>,
        fail: bool,
    }

    impl CountingCatalog {
        fn new(columns: Vec<ColumnDescriptor>) -> Self {
            Self {
                columns,
                queries: Mutex::new(0),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                columns: vec![],
                queries: Mutex::new(0),
                fail: true,
            }
        }

        fn query_count(&self) -> u32 {
            *self.queries.lock().unwrap()
        }
    }

    impl CatalogClient for CountingCatalog {
        async fn query_columns(
            &self,
            _schema: &str,
            _table: &str,
        ) -> Result<Vec<ColumnDescriptor>, RelayError> {
            *self.queries.lock().unwrap() += 1;

            if self.fail {
                return Err(relay_error!(
                    ErrorKind::SourceQueryFailed,
                    "Catalog query failed"
                ));
            }

            Ok(self.columns.clone())
        }
    }

    fn column(name: &str) -> ColumnDescriptor {
        ColumnDescriptor::new(
            name.to_string(),
            None,
            None,
            String::new(),
            "int".to_string(),
        )
    }

    fn users_table() -> TableName {
        TableName::new("app".to_string(), "users".to_string())
    }

    #[tokio::test]
    async fn repeated_resolution_issues_one_catalog_query() {
        let catalog = Arc::new(CountingCatalog::new(vec![column("id"), column("age")]));
        let resolver = SchemaResolver::new(catalog.clone(), SchemaCache::new());
        let table_id = TableId::new(7);

        let first = resolver
            .resolve(table_id, &users_table(), &[3, 3])
            .await
            .unwrap();
        let second = resolver
            .resolve(table_id, &users_table(), &[3, 3])
            .await
            .unwrap();

        assert_eq!(catalog.query_count(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn refresh_overwrites_cached_descriptor() {
        let catalog = Arc::new(CountingCatalog::new(vec![column("id"), column("age")]));
        let resolver = SchemaResolver::new(catalog.clone(), SchemaCache::new());
        let table_id = TableId::new(7);

        resolver
            .resolve(table_id, &users_table(), &[3, 3])
            .await
            .unwrap();
        let refreshed = resolver
            .refresh(table_id, &users_table(), &[3, 3])
            .await
            .unwrap();

        assert_eq!(catalog.query_count(), 2);
        assert_eq!(resolver.cached(&table_id).await.unwrap(), refreshed);
    }

    #[tokio::test]
    async fn catalog_failure_is_fatal_and_caches_nothing() {
        let catalog = Arc::new(CountingCatalog::failing());
        let resolver = SchemaResolver::new(catalog, SchemaCache::new());
        let table_id = TableId::new(7);

        let err = resolver
            .resolve(table_id, &users_table(), &[3])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceQueryFailed);
        assert!(resolver.cached(&table_id).await.is_none());
    }

    #[tokio::test]
    async fn column_count_mismatch_is_fatal() {
        let catalog = Arc::new(CountingCatalog::new(vec![column("id")]));
        let resolver = SchemaResolver::new(catalog, SchemaCache::new());

        let err = resolver
            .resolve(TableId::new(7), &users_table(), &[3, 15])
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::SourceSchemaError);
    }
}
