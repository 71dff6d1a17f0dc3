//! Event publication abstraction.
//!
//! Aggregates never call their collaborators directly; command handlers drain
//! uncommitted events and publish them to an [`EventSink`]. The HUD, the pause
//! overlay and the parent application subscribe through an [`EventBus`].

use std::sync::Arc;

use crate::event::EventEnvelope;

/// A subscriber that receives every published event, in publication order.
pub trait EventSink: Send + Sync {
    /// Receives one published event.
    fn publish(&self, envelope: &EventEnvelope);
}

/// Fan-out sink that forwards each event to every subscriber in
/// registration order.
#[derive(Default, Clone)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn EventSink>>,
}

impl EventBus {
    /// Creates a bus with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a subscriber.
    pub fn subscribe(&mut self, subscriber: Arc<dyn EventSink>) {
        self.subscribers.push(subscriber);
    }

    /// Returns the number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl EventSink for EventBus {
    fn publish(&self, envelope: &EventEnvelope) {
        for subscriber in &self.subscribers {
            subscriber.publish(envelope);
        }
    }
}
