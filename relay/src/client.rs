use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::catalog::{CatalogClient, ChecksumConfig};
use crate::concurrency::gate::ReadinessGate;
use crate::concurrency::shutdown::{ShutdownTx, create_shutdown_channel};
use crate::error::{ErrorKind, RelayError, RelayResult};
use crate::relay_error;
use crate::replication::negotiate::{NegotiatedCapabilities, negotiate_capabilities};
use crate::replication::relay::RelayWorker;
use crate::schema::cache::SchemaCache;
use crate::schema::resolver::SchemaResolver;
use crate::source::{SourceConnector, SourceSettings};
use crate::types::{ClientId, EventType, StreamEvent};

/// Capacity of the subscriber broadcast channel.
///
/// Emission is fire-and-forget: a subscriber that falls further behind than
/// this many events starts losing the oldest ones, it cannot slow the relay
/// down.
const EVENTS_CHANNEL_CAPACITY: usize = 1024;

/// Outcome of the capability negotiation phase.
#[derive(Debug, Clone)]
enum NegotiationStatus {
    Pending,
    Ready(NegotiatedCapabilities),
    Failed(RelayError),
}

/// A deferred start action captured by the readiness gate.
#[derive(Debug)]
struct StartRequest {
    filter: Option<HashSet<EventType>>,
}

/// Client for the binlog event relay.
///
/// Construction spawns the capability negotiation task; the client is usable
/// for queuing start requests immediately, but no stream is opened until
/// negotiation resolves. Start requests issued before readiness are executed
/// exactly once, in request order, when negotiation completes.
///
/// All state is per instance: multiple independent clients can coexist in the
/// same process without interference.
#[derive(Debug)]
pub struct BinlogClient {
    id: ClientId,
    schema_cache: SchemaCache,
    gate: Arc<ReadinessGate<StartRequest>>,
    events_tx: broadcast::Sender<StreamEvent>,
    shutdown_tx: ShutdownTx,
    status_rx: watch::Receiver<NegotiationStatus>,
    dispatcher: JoinHandle<Vec<JoinHandle<RelayResult<()>>>>,
}

impl BinlogClient {
    /// Creates a new client over the given catalog adapter and source
    /// connector, and begins capability negotiation in the background.
    pub fn new<C, S>(id: ClientId, catalog: C, connector: S) -> Self
    where
        C: CatalogClient + ChecksumConfig + Send + Sync + 'static,
        S: SourceConnector + Send + Sync + 'static,
    {
        let catalog = Arc::new(catalog);
        let connector = Arc::new(connector);
        let schema_cache = SchemaCache::new();
        let (events_tx, _) = broadcast::channel(EVENTS_CHANNEL_CAPACITY);
        let (shutdown_tx, _) = create_shutdown_channel();
        let (status_tx, status_rx) = watch::channel(NegotiationStatus::Pending);
        let (request_tx, request_rx) = mpsc::unbounded_channel();
        let gate = Arc::new(ReadinessGate::new(request_tx));

        let dispatcher = tokio::spawn(dispatch_start_requests(
            request_rx,
            catalog.clone(),
            connector,
            schema_cache.clone(),
            events_tx.clone(),
            shutdown_tx.clone(),
            status_rx.clone(),
        ));

        tokio::spawn(run_negotiation(id, catalog, status_tx, gate.clone()));

        Self {
            id,
            schema_cache,
            gate,
            events_tx,
            shutdown_tx,
            status_rx,
            dispatcher,
        }
    }

    /// Returns the id of this client.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// Requests the relay to start streaming.
    ///
    /// With a filter, only events whose type is in the set are emitted to
    /// subscribers; without one, every event is emitted. If capability
    /// negotiation has not completed yet, the start action is queued and
    /// executed when it does; the call returns immediately either way.
    pub fn start(&self, filter: Option<HashSet<EventType>>) {
        self.gate.when_ready(StartRequest { filter });
    }

    /// Subscribes to the relayed event stream.
    ///
    /// Subscribers can be added and dropped dynamically; each receives every
    /// event emitted after the subscription was created.
    pub fn subscribe(&self) -> broadcast::Receiver<StreamEvent> {
        self.events_tx.subscribe()
    }

    /// Returns a handle to the schema cache.
    ///
    /// Event producers use this to decode row events with the column
    /// metadata the relay has resolved.
    pub fn schema_cache(&self) -> SchemaCache {
        self.schema_cache.clone()
    }

    /// Returns `true` once capability negotiation has completed successfully.
    pub fn is_ready(&self) -> bool {
        self.gate.is_ready()
    }

    /// Waits for capability negotiation to resolve.
    ///
    /// Returns the negotiated capabilities on success, or the fatal
    /// negotiation error. The outcome is stable: repeated calls return the
    /// same result.
    pub async fn ready(&self) -> RelayResult<NegotiatedCapabilities> {
        let mut status_rx = self.status_rx.clone();
        let status = status_rx
            .wait_for(|status| !matches!(status, NegotiationStatus::Pending))
            .await
            .map_err(|_| {
                relay_error!(
                    ErrorKind::InvalidState,
                    "Negotiation task terminated without publishing an outcome"
                )
            })?;

        match &*status {
            NegotiationStatus::Ready(capabilities) => Ok(*capabilities),
            NegotiationStatus::Failed(err) => Err(err.clone()),
            NegotiationStatus::Pending => unreachable!("waited for a non-pending status"),
        }
    }

    /// Signals all relay workers to shut down at the next event boundary.
    pub fn shutdown(&self) {
        info!("trying to shut down client {}", self.id);

        if self.shutdown_tx.shutdown().is_err() {
            info!("no active relay workers to notify");
        }
    }

    /// Waits for every relay worker to complete and returns the aggregated
    /// outcome.
    ///
    /// Surfaces the negotiation failure if negotiation failed (queued start
    /// requests never execute in that case), then every worker failure,
    /// aggregated into a single error.
    pub async fn wait(self) -> RelayResult<()> {
        let negotiation = self.ready().await;

        // Dropping the gate closes the dispatch channel once queued requests
        // have been drained, letting the dispatcher task finish.
        drop(self.gate);

        let workers = self.dispatcher.await.map_err(|err| {
            relay_error!(
                ErrorKind::RelayWorkerPanic,
                "Relay dispatcher task panicked",
                err.to_string()
            )
        })?;

        info!("waiting for {} relay workers to complete", workers.len());

        let mut errors = Vec::new();
        if let Err(err) = negotiation {
            errors.push(err);
        }

        for worker in workers {
            match worker.await {
                Ok(Ok(())) => {}
                Ok(Err(err)) => errors.push(err),
                Err(err) => errors.push(relay_error!(
                    ErrorKind::RelayWorkerPanic,
                    "Relay worker task panicked",
                    err.to_string()
                )),
            }
        }

        if !errors.is_empty() {
            return Err(errors.into());
        }

        Ok(())
    }

    /// Shuts the client down and waits for all workers to complete.
    pub async fn shutdown_and_wait(self) -> RelayResult<()> {
        self.shutdown();
        self.wait().await
    }
}

/// Runs capability negotiation and opens the readiness gate on success.
async fn run_negotiation<C>(
    id: ClientId,
    catalog: Arc<C>,
    status_tx: watch::Sender<NegotiationStatus>,
    gate: Arc<ReadinessGate<StartRequest>>,
) where
    C: ChecksumConfig + Send + Sync + 'static,
{
    info!("negotiating stream capabilities for client {}", id);

    match negotiate_capabilities(catalog.as_ref()).await {
        Ok(capabilities) => {
            info!(
                checksum_enabled = capabilities.checksum_enabled,
                "capability negotiation completed"
            );

            // Publish the capabilities before opening the gate so drained
            // start requests observe them.
            status_tx.send_replace(NegotiationStatus::Ready(capabilities));
            gate.mark_ready();
        }
        Err(err) => {
            error!("capability negotiation failed for client {}: {}", id, err);

            status_tx.send_replace(NegotiationStatus::Failed(err));
        }
    }
}

/// Executes start requests in arrival order, spawning one relay worker per
/// request.
async fn dispatch_start_requests<C, S>(
    mut request_rx: mpsc::UnboundedReceiver<StartRequest>,
    catalog: Arc<C>,
    connector: Arc<S>,
    schema_cache: SchemaCache,
    events_tx: broadcast::Sender<StreamEvent>,
    shutdown_tx: ShutdownTx,
    status_rx: watch::Receiver<NegotiationStatus>,
) -> Vec<JoinHandle<RelayResult<()>>>
where
    C: CatalogClient + Send + Sync + 'static,
    S: SourceConnector + Send + Sync + 'static,
{
    let mut workers = Vec::new();

    while let Some(request) = request_rx.recv().await {
        // The gate only dispatches after negotiation succeeded; anything else
        // here is a bug in the readiness protocol.
        let NegotiationStatus::Ready(capabilities) = status_rx.borrow().clone() else {
            panic!("start request dispatched before capability negotiation completed");
        };

        let settings = SourceSettings {
            capabilities,
            schema_cache: schema_cache.clone(),
        };
        let resolver = SchemaResolver::new(catalog.clone(), schema_cache.clone());
        let events_tx = events_tx.clone();
        let shutdown_rx = shutdown_tx.subscribe();
        let connector = connector.clone();

        workers.push(tokio::spawn(async move {
            let source = connector.open(settings).await?;

            RelayWorker::new(source, resolver, request.filter, events_tx, shutdown_rx)
                .run()
                .await
        }));
    }

    workers
}
