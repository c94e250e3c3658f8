//! Broadcast-based shutdown coordination.
//!
//! Every long-lived task subscribes; triggering once fans out to all of
//! them. Receivers created after the trigger still observe it as a
//! closed channel, so late subscribers exit too.

use tokio::sync::broadcast;

pub struct Shutdown {
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    pub fn trigger(&self) {
        // Zero receivers is fine, nothing was listening yet.
        let _ = self.tx.send(());
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
