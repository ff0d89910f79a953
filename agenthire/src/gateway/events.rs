use super::protocol::GatewayEvent;
use tokio::sync::broadcast;

const CHANNEL_CAPACITY: usize = 256;

/// Fan-out of gateway events to every subscriber (WebSocket clients, CLI
/// progress printer). Slow subscribers lag and skip events.
pub struct EventBroadcaster {
    tx: broadcast::Sender<GatewayEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn broadcast(&self, event: GatewayEvent) {
        // send only fails when nobody is subscribed
        if let Ok(n) = self.tx.send(event) {
            log::trace!("[gateway] Event delivered to {} subscribers", n);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}
