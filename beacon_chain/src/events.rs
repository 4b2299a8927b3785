use serde_derive::{Deserialize, Serialize};
use tokio::sync::broadcast;
use types::{Epoch, Hash256, Slot};

const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Events the core emits to subscribers. Delivery is best-effort and unordered across distinct
/// kinds; per-kind delivery order matches emission order because each kind has its own broadcast
/// channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum EventKind {
    HeadUpdated {
        root: Hash256,
        slot: Slot,
        optimistic: bool,
    },
    Finalized {
        epoch: Epoch,
        root: Hash256,
    },
    Justified {
        epoch: Epoch,
        root: Hash256,
    },
    InvalidBlock {
        root: Hash256,
        reason: String,
    },
}

/// Fans out chain events to any number of subscribers via per-kind broadcast channels, mirroring
/// `ServerSentEventHandler`: a slow or absent subscriber never blocks block processing, since
/// `broadcast::Sender::send` only fails (silently, from the publisher's point of view) when there
/// are no receivers.
pub struct EventHandler {
    head_updated_tx: broadcast::Sender<EventKind>,
    finalized_tx: broadcast::Sender<EventKind>,
    justified_tx: broadcast::Sender<EventKind>,
    invalid_block_tx: broadcast::Sender<EventKind>,
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl EventHandler {
    pub fn new(capacity: usize) -> Self {
        Self {
            head_updated_tx: broadcast::channel(capacity).0,
            finalized_tx: broadcast::channel(capacity).0,
            justified_tx: broadcast::channel(capacity).0,
            invalid_block_tx: broadcast::channel(capacity).0,
        }
    }

    pub fn register(&self, event: EventKind) {
        match event {
            EventKind::HeadUpdated { .. } => {
                let _ = self.head_updated_tx.send(event);
            }
            EventKind::Finalized { .. } => {
                let _ = self.finalized_tx.send(event);
            }
            EventKind::Justified { .. } => {
                let _ = self.justified_tx.send(event);
            }
            EventKind::InvalidBlock { .. } => {
                let _ = self.invalid_block_tx.send(event);
            }
        }
    }

    pub fn subscribe_head_updated(&self) -> broadcast::Receiver<EventKind> {
        self.head_updated_tx.subscribe()
    }

    pub fn subscribe_finalized(&self) -> broadcast::Receiver<EventKind> {
        self.finalized_tx.subscribe()
    }

    pub fn subscribe_justified(&self) -> broadcast::Receiver<EventKind> {
        self.justified_tx.subscribe()
    }

    pub fn subscribe_invalid_block(&self) -> broadcast::Receiver<EventKind> {
        self.invalid_block_tx.subscribe()
    }

    pub fn has_head_updated_subscribers(&self) -> bool {
        self.head_updated_tx.receiver_count() > 0
    }

    pub fn has_finalized_subscribers(&self) -> bool {
        self.finalized_tx.receiver_count() > 0
    }

    pub fn has_justified_subscribers(&self) -> bool {
        self.justified_tx.receiver_count() > 0
    }

    pub fn has_invalid_block_subscribers(&self) -> bool {
        self.invalid_block_tx.receiver_count() > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registering_without_subscribers_does_not_panic() {
        let handler = EventHandler::default();
        handler.register(EventKind::HeadUpdated {
            root: Hash256::zero(),
            slot: Slot::new(0),
            optimistic: false,
        });
    }

    #[tokio::test]
    async fn subscriber_receives_registered_event() {
        let handler = EventHandler::default();
        let mut rx = handler.subscribe_finalized();
        handler.register(EventKind::Finalized {
            epoch: Epoch::new(5),
            root: Hash256::from_low_u64_be(1),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event, EventKind::Finalized { epoch, .. } if epoch == Epoch::new(5)));
    }
}
