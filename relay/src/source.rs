//! The boundary to the raw binlog event producer.
//!
//! The wire-protocol decoder that turns network bytes into typed events is an
//! external collaborator; the relay only relies on the ordered, pausable
//! delivery contract captured by [`EventSource`].

use std::future::Future;

use crate::error::RelayResult;
use crate::replication::negotiate::NegotiatedCapabilities;
use crate::schema::cache::SchemaCache;
use crate::types::StreamEvent;

/// Parameters handed to a connector when a stream is opened.
///
/// The schema cache is shared with the producer so it can decode row events
/// with the column metadata the relay has resolved; the capabilities tell the
/// decoder whether events carry a trailing checksum.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    /// Capabilities negotiated with the source database.
    pub capabilities: NegotiatedCapabilities,
    /// Read handle into the relay's schema cache.
    pub schema_cache: SchemaCache,
}

/// An opaque ordered producer of decoded binlog events.
///
/// Implementations must deliver events in strict arrival order, deliver no
/// event while paused, and deliver every event exactly once after resuming.
/// The relay pulls one event at a time and never requests the next event
/// while a schema resolution for the current one is outstanding.
pub trait EventSource {
    /// Waits for the next event from the stream.
    ///
    /// Returns `Ok(None)` when the stream has ended. Any producer failure is
    /// fatal to the relay and must not be retried internally.
    fn next_event(&mut self) -> impl Future<Output = RelayResult<Option<StreamEvent>>> + Send;

    /// Signals the transport to halt event delivery.
    fn pause(&mut self);

    /// Signals the transport to resume event delivery.
    fn resume(&mut self);
}

/// Factory for event sources, invoked once per start request.
///
/// Connectors encapsulate transport establishment and authentication, which
/// are outside the relay core. A connector is only invoked after capability
/// negotiation has completed, since the decoder cannot be configured without
/// the checksum capability.
pub trait SourceConnector {
    /// The event source type produced by this connector.
    type Source: EventSource + Send + 'static;

    /// Opens a new event stream with the given settings.
    fn open(
        &self,
        settings: SourceSettings,
    ) -> impl Future<Output = RelayResult<Self::Source>> + Send;
}

impl<S> SourceConnector for std::sync::Arc<S>
where
    S: SourceConnector,
{
    type Source = S::Source;

    fn open(
        &self,
        settings: SourceSettings,
    ) -> impl Future<Output = RelayResult<Self::Source>> + Send {
        self.as_ref().open(settings)
    }
}
