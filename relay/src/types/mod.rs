mod event;
mod row;

pub use event::*;
pub use row::*;

/// Unique identifier of a relay client instance.
///
/// Multiple independent clients can coexist in a process; the id is used to
/// correlate log lines with the client that produced them.
pub type ClientId = u64;
