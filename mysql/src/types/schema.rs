use std::fmt;

/// A numeric table identifier as carried by binlog events.
///
/// Table ids are assigned by the server per replication session and reference
/// the table-map event that most recently described the table. They are not
/// stable across server restarts, which is why metadata lookups key on the
/// human-readable [`TableName`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(u64);

impl TableId {
    pub fn new(id: u64) -> TableId {
        Self(id)
    }

    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl From<u64> for TableId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A fully qualified MySQL table name consisting of a schema (database) and
/// table name.
#[derive(Debug, Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TableName {
    /// The schema (database) name containing the table.
    pub schema: String,
    /// The name of the table within the schema.
    pub name: String,
}

impl TableName {
    pub fn new(schema: String, name: String) -> TableName {
        Self { schema, name }
    }

    /// Returns the table name as a properly quoted MySQL identifier.
    ///
    /// Schema and table names are escaped according to MySQL identifier
    /// quoting rules using backticks.
    pub fn as_quoted_identifier(&self) -> String {
        format!("`{}`.`{}`", self.schema, self.name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_fmt(format_args!("{0}.{1}", self.schema, self.name))
    }
}

/// Metadata for a single column as stored in `information_schema.columns`.
///
/// Collation and character set are `None` for non-text columns, mirroring the
/// NULL values the catalog reports for them.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ColumnDescriptor {
    /// The name of the column.
    pub name: String,
    /// The collation of the column, for text columns.
    pub collation: Option<String>,
    /// The character set of the column, for text columns.
    pub charset: Option<String>,
    /// The comment attached to the column definition.
    pub comment: String,
    /// The declared column type as a string, e.g. `varchar(255)`.
    pub column_type: String,
}

impl ColumnDescriptor {
    pub fn new(
        name: String,
        collation: Option<String>,
        charset: Option<String>,
        comment: String,
        column_type: String,
    ) -> ColumnDescriptor {
        Self {
            name,
            collation,
            charset,
            comment,
            column_type,
        }
    }
}

/// Resolved metadata for a table referenced by the replication stream.
///
/// A descriptor is built once from the catalog when a table-map event for an
/// unseen (or redefined) table id is processed, and is immutable afterwards.
/// The `wire_types` field records the column type codes observed on the wire
/// in the event that triggered resolution; a later table-map event whose type
/// codes differ marks a redefinition of the table.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TableDescriptor {
    /// The table id the descriptor was resolved for.
    pub id: TableId,
    /// The fully qualified name the table had on the wire.
    pub name: TableName,
    /// Column metadata in ordinal position order.
    pub columns: Vec<ColumnDescriptor>,
    /// Wire-level column type codes, one per column.
    pub wire_types: Vec<u8>,
}

impl TableDescriptor {
    pub fn new(
        id: TableId,
        name: TableName,
        columns: Vec<ColumnDescriptor>,
        wire_types: Vec<u8>,
    ) -> TableDescriptor {
        Self {
            id,
            name,
            columns,
            wire_types,
        }
    }

    /// Returns `true` if the descriptor still matches the column layout
    /// observed on the wire.
    ///
    /// A mismatch means the table was redefined since the descriptor was
    /// resolved and the cached entry must not be used to interpret the event.
    pub fn matches_wire_layout(&self, wire_types: &[u8]) -> bool {
        self.wire_types == wire_types
    }

    /// Returns the number of columns in the descriptor.
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }
}
