use tokio::sync::watch;

/// Transmitter side of the shutdown coordination channel.
///
/// [`ShutdownTx`] broadcasts a shutdown request to every relay worker
/// subscribed to the channel. Workers observe the signal with priority over
/// incoming events and terminate at the next event boundary.
#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<()>);

impl ShutdownTx {
    /// Sends the shutdown signal to all subscribed workers.
    ///
    /// Fails when no worker is currently subscribed, which callers may treat
    /// as "nothing to shut down".
    pub fn shutdown(&self) -> Result<(), watch::error::SendError<()>> {
        self.0.send(())
    }

    /// Creates a new shutdown receiver subscription.
    pub fn subscribe(&self) -> ShutdownRx {
        self.0.subscribe()
    }
}

/// Receiver side of the shutdown coordination channel.
pub type ShutdownRx = watch::Receiver<()>;

/// Creates a new shutdown coordination channel.
pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(());
    (ShutdownTx(tx), rx)
}
