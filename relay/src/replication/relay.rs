use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::catalog::CatalogClient;
use crate::concurrency::shutdown::ShutdownRx;
use crate::error::RelayResult;
use crate::schema::resolver::SchemaResolver;
use crate::source::EventSource;
use crate::types::{EventType, StreamEvent, TableMapEvent};

/// State of the relay event loop.
///
/// The loop alternates between [`RelayState::Streaming`] and
/// [`RelayState::AwaitingSchema`]: while a schema resolution is outstanding
/// the upstream source is paused and no further event is requested, which is
/// what guarantees that no event overtakes the enrichment of the one that
/// triggered the fetch.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RelayState {
    /// Constructed, not yet pulling events.
    Idle,
    /// Pulling events one at a time and forwarding them.
    Streaming,
    /// Upstream delivery halted while a schema fetch is in flight.
    AwaitingSchema,
    /// The loop has terminated and will never pull again.
    Stopped,
}

impl Display for RelayState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Streaming => write!(f, "streaming"),
            Self::AwaitingSchema => write!(f, "awaiting_schema"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// The relay event loop.
///
/// Consumes events from an [`EventSource`], resolves schema dependencies for
/// table-map events through the [`SchemaResolver`], applies the optional
/// event-type filter, and forwards qualifying events to subscribers. Events
/// are emitted in the exact order they were received; enrichment only inserts
/// a bounded delay before a given event's emission, never a reordering across
/// events.
pub struct RelayWorker<S, C> {
    source: S,
    resolver: SchemaResolver<C>,
    filter: Option<HashSet<EventType>>,
    events_tx: broadcast::Sender<StreamEvent>,
    shutdown_rx: ShutdownRx,
    state: RelayState,
}

impl<S, C> RelayWorker<S, C>
where
    S: EventSource,
    C: CatalogClient,
{
    pub fn new(
        source: S,
        resolver: SchemaResolver<C>,
        filter: Option<HashSet<EventType>>,
        events_tx: broadcast::Sender<StreamEvent>,
        shutdown_rx: ShutdownRx,
    ) -> Self {
        Self {
            source,
            resolver,
            filter,
            events_tx,
            shutdown_rx,
            state: RelayState::Idle,
        }
    }

    /// Runs the event loop until the stream ends, a fatal error occurs, or
    /// shutdown is requested.
    pub async fn run(mut self) -> RelayResult<()> {
        info!("relay worker started");
        self.transition(RelayState::Streaming);

        let result = loop {
            tokio::select! {
                biased;

                _ = self.shutdown_rx.changed() => {
                    info!("shutting down relay worker");
                    break Ok(());
                }

                event = self.source.next_event() => {
                    let event = match event {
                        Ok(Some(event)) => event,
                        Ok(None) => {
                            info!("event stream ended");
                            break Ok(());
                        }
                        // Producer failures are fatal: skipping or guessing at
                        // an event risks silent corruption downstream.
                        Err(err) => break Err(err),
                    };

                    if let Err(err) = self.process_event(event).await {
                        break Err(err);
                    }
                }
            }
        };

        self.transition(RelayState::Stopped);

        result
    }

    /// Processes one event fully before the next one is requested.
    async fn process_event(&mut self, event: StreamEvent) -> RelayResult<()> {
        match event {
            StreamEvent::TableMap(event) => self.process_table_map(event).await,
            event => {
                self.emit(event);

                Ok(())
            }
        }
    }

    /// Handles a table-map event, resolving its schema dependency first.
    ///
    /// A cached descriptor that still matches the wire layout is attached
    /// without halting the stream. An unseen table id, or one whose wire
    /// layout changed since the descriptor was resolved (the table was
    /// redefined), halts upstream delivery until the fresh descriptor has
    /// been fetched, attached, and the enriched event emitted. No event for
    /// any table can reach subscribers between the start of the fetch and
    /// that emission.
    async fn process_table_map(&mut self, mut event: TableMapEvent) -> RelayResult<()> {
        let cached = self.resolver.cached(&event.table_id).await;

        if let Some(descriptor) = cached.clone()
            && descriptor.matches_wire_layout(&event.column_types)
        {
            event.descriptor = Some(descriptor);
            self.emit(StreamEvent::TableMap(event));

            return Ok(());
        }

        let redefined = cached.is_some();
        if redefined {
            warn!(
                "table {} (id {}) was redefined, refreshing its descriptor",
                event.table_name, event.table_id
            );
        }

        self.transition(RelayState::AwaitingSchema);
        self.source.pause();

        let resolution = if redefined {
            // The cached descriptor no longer matches the wire layout, so it
            // must be replaced rather than served.
            self.resolver
                .refresh(event.table_id, &event.table_name, &event.column_types)
                .await
        } else {
            self.resolver
                .resolve(event.table_id, &event.table_name, &event.column_types)
                .await
        };

        event.descriptor = Some(resolution?);
        self.emit(StreamEvent::TableMap(event));

        self.source.resume();
        self.transition(RelayState::Streaming);

        Ok(())
    }

    /// Emits an event to subscribers, subject to the configured filter.
    ///
    /// Emission is fire-and-forget: a send only fails when no subscriber is
    /// currently connected, which is not an error for the relay.
    fn emit(&self, event: StreamEvent) {
        if let Some(filter) = &self.filter
            && !filter.contains(&event.event_type())
        {
            debug!("dropping {} event excluded by filter", event.event_type());
            return;
        }

        let _ = self.events_tx.send(event);
    }

    fn transition(&mut self, state: RelayState) {
        debug!(from = %self.state, to = %state, "relay state transition");
        self.state = state;
    }
}
