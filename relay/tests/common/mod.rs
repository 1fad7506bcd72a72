#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration;

use mysql::types::{ColumnDescriptor, TableId, TableName};
use relay::catalog::{CatalogClient, ChecksumConfig};
use relay::concurrency::pause::{PauseRx, PauseTx, create_pause_channel};
use relay::error::{ErrorKind, RelayResult};
use relay::relay_error;
use relay::source::{EventSource, SourceConnector, SourceSettings};
use relay::types::{
    DeleteRowsEvent, EventType, InsertRowsEvent, RotateEvent, RowData, RowValue, StreamEvent,
    TableMapEvent, XidEvent,
};
use tokio::sync::broadcast;
use tokio::time::timeout;
use tracing_subscriber::EnvFilter;

/// Timeout for every awaited condition in tests, so a broken relay fails fast
/// instead of hanging.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

static TRACING: Once = Once::new();

/// Installs a tracing subscriber for test output, once per process.
pub fn init_test_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A step observed by the shared probe log.
///
/// Both the scripted source and the scripted catalog append to the same log,
/// which lets tests assert the interleaving of deliveries, pause signals and
/// catalog fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Probe {
    Delivered(EventType),
    Paused,
    Resumed,
    Fetched(String),
}

pub type ProbeLog = Arc<Mutex<Vec<Probe>>>;

pub fn new_probe_log() -> ProbeLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn probes(log: &ProbeLog) -> Vec<Probe> {
    log.lock().unwrap().clone()
}

/// How a scripted source behaves once its events are exhausted.
#[derive(Debug, Clone)]
pub enum EndOfScript {
    /// The stream ends cleanly.
    Finish,
    /// The producer fails with the given error kind.
    Error(ErrorKind),
    /// The stream stays open without delivering further events.
    Hold,
}

/// Script for a single opened source.
#[derive(Debug, Clone)]
pub struct SourceScript {
    pub events: Vec<StreamEvent>,
    pub end: EndOfScript,
}

impl SourceScript {
    pub fn finishing(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            end: EndOfScript::Finish,
        }
    }

    pub fn failing(events: Vec<StreamEvent>, kind: ErrorKind) -> Self {
        Self {
            events,
            end: EndOfScript::Error(kind),
        }
    }

    pub fn holding(events: Vec<StreamEvent>) -> Self {
        Self {
            events,
            end: EndOfScript::Hold,
        }
    }
}

/// Scripted event source honoring the pause/resume contract.
///
/// Delivery waits while paused, so an ordering bug in the relay would surface
/// as a hung test rather than a silently reordered stream.
pub struct ScriptedSource {
    events: VecDeque<StreamEvent>,
    end: EndOfScript,
    pause_tx: PauseTx,
    pause_rx: PauseRx,
    probes: ProbeLog,
}

impl ScriptedSource {
    pub fn new(script: SourceScript, probes: ProbeLog) -> Self {
        let (pause_tx, pause_rx) = create_pause_channel();

        Self {
            events: script.events.into(),
            end: script.end,
            pause_tx,
            pause_rx,
            probes,
        }
    }
}

impl EventSource for ScriptedSource {
    async fn next_event(&mut self) -> RelayResult<Option<StreamEvent>> {
        // No delivery while paused.
        self.pause_rx
            .wait_for(|paused| !*paused)
            .await
            .expect("pause channel closed");

        match self.events.pop_front() {
            Some(event) => {
                self.probes
                    .lock()
                    .unwrap()
                    .push(Probe::Delivered(event.event_type()));

                Ok(Some(event))
            }
            None => match &self.end {
                EndOfScript::Finish => Ok(None),
                EndOfScript::Error(kind) => Err(relay_error!(*kind, "Scripted producer failure")),
                EndOfScript::Hold => std::future::pending().await,
            },
        }
    }

    fn pause(&mut self) {
        self.probes.lock().unwrap().push(Probe::Paused);
        self.pause_tx.pause();
    }

    fn resume(&mut self) {
        self.probes.lock().unwrap().push(Probe::Resumed);
        self.pause_tx.resume();
    }
}

/// Connector serving one [`SourceScript`] per open, in script order.
pub struct ScriptedConnector {
    scripts: Mutex<VecDeque<SourceScript>>,
    open_settings: Mutex<Vec<SourceSettings>>,
    fail_open: bool,
    probes: ProbeLog,
}

impl ScriptedConnector {
    pub fn new(scripts: Vec<SourceScript>, probes: ProbeLog) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            open_settings: Mutex::new(Vec::new()),
            fail_open: false,
            probes,
        }
    }

    pub fn failing_to_open(probes: ProbeLog) -> Self {
        Self {
            scripts: Mutex::new(VecDeque::new()),
            open_settings: Mutex::new(Vec::new()),
            fail_open: true,
            probes,
        }
    }

    /// Returns how many streams have been opened so far.
    pub fn open_count(&self) -> usize {
        self.open_settings.lock().unwrap().len()
    }

    /// Returns the checksum capability each opened stream was configured
    /// with.
    pub fn opened_with_checksum(&self) -> Vec<bool> {
        self.open_settings
            .lock()
            .unwrap()
            .iter()
            .map(|settings| settings.capabilities.checksum_enabled)
            .collect()
    }
}

impl SourceConnector for ScriptedConnector {
    type Source = ScriptedSource;

    async fn open(&self, settings: SourceSettings) -> RelayResult<Self::Source> {
        if self.fail_open {
            return Err(relay_error!(
                ErrorKind::SourceConnectionFailed,
                "Scripted connection failure"
            ));
        }

        self.open_settings.lock().unwrap().push(settings);

        let script = self
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| SourceScript::finishing(vec![]));

        Ok(ScriptedSource::new(script, self.probes.clone()))
    }
}

/// Scripted outcome of the checksum setting query.
#[derive(Debug, Clone)]
pub enum ChecksumScript {
    Reports(&'static str),
    FailsWith(ErrorKind),
}

/// Scripted catalog and checksum adapter.
///
/// Column responses are queued per table; the last response for a table is
/// sticky so repeated fetches after the queue drains keep succeeding.
pub struct ScriptedCatalog {
    columns: Mutex<HashMap<(String, String), VecDeque<Vec<ColumnDescriptor>>>>,
    checksum: ChecksumScript,
    apply_fails: bool,
    applied: Mutex<Vec<String>>,
    hold_negotiation: Option<Arc<tokio::sync::Notify>>,
    probes: ProbeLog,
}

impl ScriptedCatalog {
    pub fn new(checksum: ChecksumScript, probes: ProbeLog) -> Self {
        Self {
            columns: Mutex::new(HashMap::new()),
            checksum,
            apply_fails: false,
            applied: Mutex::new(Vec::new()),
            hold_negotiation: None,
            probes,
        }
    }

    /// Makes the checksum query wait until the returned handle is notified,
    /// keeping the client in the not-ready state under test control.
    pub fn hold_negotiation(mut self) -> (Self, Arc<tokio::sync::Notify>) {
        let release = Arc::new(tokio::sync::Notify::new());
        self.hold_negotiation = Some(release.clone());
        (self, release)
    }

    pub fn failing_alignment(mut self) -> Self {
        self.apply_fails = true;
        self
    }

    /// Queues a column response for the given table.
    pub fn with_columns(self, schema: &str, table: &str, columns: Vec<ColumnDescriptor>) -> Self {
        self.columns
            .lock()
            .unwrap()
            .entry((schema.to_string(), table.to_string()))
            .or_default()
            .push_back(columns);
        self
    }

    pub fn applied_settings(&self) -> Vec<String> {
        self.applied.lock().unwrap().clone()
    }

    pub fn fetch_count(&self) -> usize {
        self.probes
            .lock()
            .unwrap()
            .iter()
            .filter(|probe| matches!(probe, Probe::Fetched(_)))
            .count()
    }
}

impl CatalogClient for ScriptedCatalog {
    async fn query_columns(&self, schema: &str, table: &str) -> RelayResult<Vec<ColumnDescriptor>> {
        self.probes
            .lock()
            .unwrap()
            .push(Probe::Fetched(format!("{schema}.{table}")));

        let mut columns = self.columns.lock().unwrap();
        let Some(responses) = columns.get_mut(&(schema.to_string(), table.to_string())) else {
            return Err(relay_error!(
                ErrorKind::SourceSchemaError,
                "Table not found in catalog",
                format!("{schema}.{table}")
            ));
        };

        let response = if responses.len() > 1 {
            responses.pop_front().expect("just checked length")
        } else {
            responses
                .front()
                .cloned()
                .expect("tables are only inserted with at least one response")
        };

        Ok(response)
    }
}

impl ChecksumConfig for ScriptedCatalog {
    async fn query_checksum_setting(&self) -> RelayResult<String> {
        if let Some(release) = &self.hold_negotiation {
            release.notified().await;
        }

        match &self.checksum {
            ChecksumScript::Reports(value) => Ok(value.to_string()),
            ChecksumScript::FailsWith(kind) => {
                Err(relay_error!(*kind, "Scripted checksum query failure"))
            }
        }
    }

    async fn apply_checksum_setting(&self, value: &str) -> RelayResult<()> {
        if self.apply_fails {
            return Err(relay_error!(
                ErrorKind::ChecksumAlignmentFailed,
                "Scripted checksum alignment failure"
            ));
        }

        self.applied.lock().unwrap().push(value.to_string());

        Ok(())
    }
}

/// Builds a table-map event as the producer would deliver it, without a
/// descriptor.
pub fn table_map(table_id: u64, schema: &str, table: &str, column_types: &[u8]) -> StreamEvent {
    StreamEvent::TableMap(TableMapEvent {
        table_id: TableId::new(table_id),
        table_name: TableName::new(schema.to_string(), table.to_string()),
        column_types: column_types.to_vec(),
        descriptor: None,
    })
}

/// Builds an insert event with one row holding a single integer value.
pub fn insert(table_id: u64, value: i64) -> StreamEvent {
    StreamEvent::Insert(InsertRowsEvent {
        table_id: TableId::new(table_id),
        rows: vec![RowData::new(vec![RowValue::Integer(value)])],
    })
}

/// Builds a delete event with one row holding a single integer value.
pub fn delete(table_id: u64, value: i64) -> StreamEvent {
    StreamEvent::Delete(DeleteRowsEvent {
        table_id: TableId::new(table_id),
        rows: vec![RowData::new(vec![RowValue::Integer(value)])],
    })
}

pub fn rotate(binlog_file: &str, position: u64) -> StreamEvent {
    StreamEvent::Rotate(RotateEvent {
        binlog_file: binlog_file.to_string(),
        position,
    })
}

pub fn xid(xid: u64) -> StreamEvent {
    StreamEvent::Xid(XidEvent { xid })
}

/// Builds a column descriptor with the given name and declared type.
pub fn column(name: &str, column_type: &str) -> ColumnDescriptor {
    ColumnDescriptor::new(
        name.to_string(),
        None,
        None,
        String::new(),
        column_type.to_string(),
    )
}

/// Receives exactly `count` events, failing the test on timeout.
pub async fn collect_events(
    rx: &mut broadcast::Receiver<StreamEvent>,
    count: usize,
) -> Vec<StreamEvent> {
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        let event = timeout(TEST_TIMEOUT, rx.recv())
            .await
            .expect("timed out waiting for an event")
            .expect("event channel closed before enough events arrived");
        events.push(event);
    }

    events
}

/// Asserts that no further event reaches the subscriber.
pub async fn assert_no_more_events(rx: &mut broadcast::Receiver<StreamEvent>) {
    match timeout(Duration::from_millis(200), rx.recv()).await {
        Err(_) => {}
        Ok(Err(broadcast::error::RecvError::Closed)) => {}
        Ok(Ok(event)) => panic!("unexpected extra event: {event:?}"),
        Ok(Err(err)) => panic!("unexpected receive error: {err:?}"),
    }
}

/// Returns the (event type, table id) shape of an event sequence for order
/// assertions that ignore enrichment payloads.
pub fn event_shapes(events: &[StreamEvent]) -> Vec<(EventType, Option<u64>)> {
    events
        .iter()
        .map(|event| {
            (
                event.event_type(),
                event.table_id().map(|id| id.into_inner()),
            )
        })
        .collect()
}
