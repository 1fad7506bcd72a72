use std::fmt;
use std::sync::Arc;

use mysql::types::{TableDescriptor, TableId, TableName};

use crate::types::{RowData, RowUpdate};

/// Table schema definition event from the binlog stream.
///
/// [`TableMapEvent`] announces the column layout of a table before row-level
/// events for that table appear. The wire form only carries the table id, the
/// table's name as seen by the server, and per-column type codes; the relay
/// enriches the event with a [`TableDescriptor`] resolved from the catalog
/// before it reaches subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct TableMapEvent {
    /// ID of the table this event describes.
    pub table_id: TableId,
    /// Schema and table name as observed on the wire.
    pub table_name: TableName,
    /// Wire-level column type codes, one per column.
    pub column_types: Vec<u8>,
    /// Resolved column metadata, attached by the relay before emission.
    pub descriptor: Option<Arc<TableDescriptor>>,
}

/// Row insertion event from the binlog stream.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertRowsEvent {
    /// ID of the table where the rows were inserted.
    pub table_id: TableId,
    /// Complete row data for the inserted rows.
    pub rows: Vec<RowData>,
}

/// Row update event from the binlog stream.
///
/// Each updated row carries both its before and after image, as the server
/// writes both to the binlog in row-based replication.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRowsEvent {
    /// ID of the table where the rows were updated.
    pub table_id: TableId,
    /// Before/after image pairs for the updated rows.
    pub rows: Vec<RowUpdate>,
}

/// Row deletion event from the binlog stream.
#[derive(Debug, Clone, PartialEq)]
pub struct DeleteRowsEvent {
    /// ID of the table where the rows were deleted.
    pub table_id: TableId,
    /// Data from the deleted rows.
    pub rows: Vec<RowData>,
}

/// Position marker event emitted when the server switches to a new binlog
/// file.
#[derive(Debug, Clone, PartialEq)]
pub struct RotateEvent {
    /// Name of the binlog file the stream continues in.
    pub binlog_file: String,
    /// Byte position within the new file.
    pub position: u64,
}

/// Transaction commit marker from the binlog stream.
#[derive(Debug, Clone, PartialEq)]
pub struct XidEvent {
    /// Transaction id assigned by the storage engine.
    pub xid: u64,
}

/// A single decoded event from the binlog replication stream.
///
/// [`StreamEvent`] is the closed set of event kinds the relay understands.
/// Unknown wire events are surfaced as [`StreamEvent::Unsupported`] rather
/// than being dropped, so subscribers can observe that something was skipped.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Table schema definition describing the column layout of a table.
    TableMap(TableMapEvent),
    /// Row insertion event with new row data.
    Insert(InsertRowsEvent),
    /// Row update event with before and after row data.
    Update(UpdateRowsEvent),
    /// Row deletion event with deleted row data.
    Delete(DeleteRowsEvent),
    /// Binlog file rotation marker.
    Rotate(RotateEvent),
    /// Transaction commit marker.
    Xid(XidEvent),
    /// Unsupported event type that cannot be processed.
    Unsupported,
}

impl StreamEvent {
    /// Returns the [`EventType`] that corresponds to this event.
    ///
    /// This provides a lightweight way to identify the event type without
    /// pattern matching on the full event structure.
    pub fn event_type(&self) -> EventType {
        self.into()
    }

    /// Returns the table id the event is scoped to, if any.
    ///
    /// Position markers and commit markers are not associated with a
    /// specific table and return [`None`].
    pub fn table_id(&self) -> Option<TableId> {
        match self {
            StreamEvent::TableMap(event) => Some(event.table_id),
            StreamEvent::Insert(event) => Some(event.table_id),
            StreamEvent::Update(event) => Some(event.table_id),
            StreamEvent::Delete(event) => Some(event.table_id),
            _ => None,
        }
    }

    /// Returns true if the event is associated with the specified table.
    pub fn has_table_id(&self, table_id: &TableId) -> bool {
        self.table_id() == Some(*table_id)
    }
}

/// Classification of binlog event types.
///
/// [`EventType`] enumerates the possible events without carrying the
/// associated data. This is what start filters match against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventType {
    /// Table schema definition.
    TableMap,
    /// Row insertion operation.
    Insert,
    /// Row update operation.
    Update,
    /// Row deletion operation.
    Delete,
    /// Binlog file rotation marker.
    Rotate,
    /// Transaction commit marker.
    Xid,
    /// Unsupported or unknown event.
    Unsupported,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TableMap => write!(f, "TableMap"),
            Self::Insert => write!(f, "Insert"),
            Self::Update => write!(f, "Update"),
            Self::Delete => write!(f, "Delete"),
            Self::Rotate => write!(f, "Rotate"),
            Self::Xid => write!(f, "Xid"),
            Self::Unsupported => write!(f, "Unsupported"),
        }
    }
}

impl From<&StreamEvent> for EventType {
    fn from(event: &StreamEvent) -> Self {
        match event {
            StreamEvent::TableMap(_) => EventType::TableMap,
            StreamEvent::Insert(_) => EventType::Insert,
            StreamEvent::Update(_) => EventType::Update,
            StreamEvent::Delete(_) => EventType::Delete,
            StreamEvent::Rotate(_) => EventType::Rotate,
            StreamEvent::Xid(_) => EventType::Xid,
            StreamEvent::Unsupported => EventType::Unsupported,
        }
    }
}

impl From<StreamEvent> for EventType {
    fn from(event: StreamEvent) -> Self {
        (&event).into()
    }
}
