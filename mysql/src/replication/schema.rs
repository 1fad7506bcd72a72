//! MySQL schema information utilities.
//!
//! Queries `information_schema` for the column metadata needed to interpret
//! row-level binlog events.

use sqlx::{MySqlPool, Row};
use thiserror::Error;
use tracing::debug;

use crate::types::{ColumnDescriptor, TableName};

/// Errors that can occur during schema lookups.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Table {0} not found")]
    TableNotFound(String),
}

/// Retrieves column metadata for a table in ordinal position order.
///
/// Returns [`SchemaError::TableNotFound`] when the catalog has no columns for
/// the given schema and table name, which means the table does not exist (or
/// was dropped between the binlog event and the lookup).
pub async fn get_table_columns(
    pool: &MySqlPool,
    table_name: &TableName,
) -> Result<Vec<ColumnDescriptor>, SchemaError> {
    let query = r#"
        SELECT
            column_name,
            collation_name,
            character_set_name,
            column_comment,
            column_type
        FROM information_schema.columns
        WHERE table_schema = ?
        AND table_name = ?
        ORDER BY ordinal_position
    "#;

    debug!("fetching column metadata for table {}", table_name);

    let rows = sqlx::query(query)
        .bind(&table_name.schema)
        .bind(&table_name.name)
        .fetch_all(pool)
        .await?;

    if rows.is_empty() {
        return Err(SchemaError::TableNotFound(table_name.to_string()));
    }

    let mut columns = Vec::with_capacity(rows.len());
    for row in rows {
        let name: String = row.try_get("column_name")?;
        let collation: Option<String> = row.try_get("collation_name")?;
        let charset: Option<String> = row.try_get("character_set_name")?;
        let comment: String = row.try_get("column_comment")?;
        let column_type: String = row.try_get("column_type")?;

        columns.push(ColumnDescriptor::new(
            name,
            collation,
            charset,
            comment,
            column_type,
        ));
    }

    Ok(columns)
}
