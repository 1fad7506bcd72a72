/// A single decoded value from a row-level binlog event.
///
/// The producer decodes wire values into this closed set using the column
/// metadata cached for the owning table. Values that have no richer mapping
/// are surfaced as raw bytes.
#[derive(Debug, Clone, PartialEq)]
pub enum RowValue {
    Null,
    Integer(i64),
    Unsigned(u64),
    Float(f64),
    Text(String),
    Bytes(Vec<u8>),
}

/// A complete row of data from a row-level binlog event.
///
/// Values are ordered to match the owning table's column order.
#[derive(Debug, Clone, PartialEq)]
pub struct RowData {
    /// Column values in table column order.
    pub values: Vec<RowValue>,
}

impl RowData {
    pub fn new(values: Vec<RowValue>) -> Self {
        Self { values }
    }
}

/// Before/after image pair for a single updated row.
#[derive(Debug, Clone, PartialEq)]
pub struct RowUpdate {
    /// Row data before the update.
    pub before: RowData,
    /// Row data after the update.
    pub after: RowData,
}
