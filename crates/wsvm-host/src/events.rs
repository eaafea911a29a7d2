//! Broadcast event sink for real-time consumers of a run.

use tokio::sync::broadcast;
use tracing::trace;
use wsvm_core::diagnostics::{EventSink, HostEvent};

/// Fans [`HostEvent`]s out to every live subscriber.
///
/// Publishing never blocks. With no subscribers the event is dropped, and a
/// subscriber that falls more than `capacity` events behind skips ahead.
#[derive(Debug, Clone)]
pub struct BroadcastSink {
    tx: broadcast::Sender<HostEvent>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HostEvent> {
        self.tx.subscribe()
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for BroadcastSink {
    fn default() -> Self {
        Self::new(256)
    }
}

impl EventSink for BroadcastSink {
    fn publish(&self, event: HostEvent) {
        if self.tx.send(event).is_err() {
            trace!("event dropped, no subscribers");
        }
    }
}
