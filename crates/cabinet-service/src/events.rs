//! Broadcast of tree mutations to outer layers.

use tokio::sync::broadcast;
use tracing::trace;

use cabinet_core::events::TreeEvent;

/// Fan-out channel for [`TreeEvent`]s.
///
/// Publishing never blocks and never fails; events sent while nobody is
/// subscribed are dropped.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<TreeEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish one event.
    pub fn publish(&self, event: TreeEvent) {
        trace!(?event, "tree event");
        let _ = self.sender.send(event);
    }

    /// Publish events in order.
    pub fn publish_all(&self, events: impl IntoIterator<Item = TreeEvent>) {
        for event in events {
            self.publish(event);
        }
    }

    /// Subscribe to events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<TreeEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
