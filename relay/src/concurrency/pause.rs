use tokio::sync::watch;

/// Transmitter side of the pause/resume coordination channel.
///
/// [`PauseTx`] allows halting and resuming event delivery from an upstream
/// source. While paused, the source must not deliver any event; every event
/// is delivered exactly once after resuming.
#[derive(Debug, Clone)]
pub struct PauseTx(watch::Sender<bool>);

impl PauseTx {
    /// Wraps a watch sender into a [`PauseTx`].
    pub fn new(tx: watch::Sender<bool>) -> Self {
        Self(tx)
    }

    /// Requests the source to pause delivery.
    pub fn pause(&self) {
        // Use infallible send to support pausing before any receivers subscribe.
        self.0.send_replace(true);
    }

    /// Requests the source to resume delivery.
    pub fn resume(&self) {
        // Use infallible send to support resuming even if no receivers are present.
        self.0.send_replace(false);
    }

    /// Creates a new pause receiver subscription.
    pub fn subscribe(&self) -> PauseRx {
        self.0.subscribe()
    }
}

/// Receiver side of the pause/resume coordination channel.
pub type PauseRx = watch::Receiver<bool>;

/// Creates a new pause coordination channel.
pub fn create_pause_channel() -> (PauseTx, PauseRx) {
    let (tx, rx) = watch::channel(false);
    (PauseTx::new(tx), rx)
}
