//! Test sinks — recording `EventSink` implementation for tests.

use std::sync::Mutex;

use descent_core::event::EventEnvelope;
use descent_core::sink::EventSink;

/// An event sink that records every published envelope.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    published: Mutex<Vec<EventEnvelope>>,
}

impl RecordingEventSink {
    /// Creates an empty recording sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of all published envelopes.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn published(&self) -> Vec<EventEnvelope> {
        self.published.lock().unwrap().clone()
    }

    /// Returns the event types published so far, in order.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn event_types(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|envelope| envelope.event_type.clone())
            .collect()
    }

    /// Returns the payloads of every envelope with the given event type.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn payloads_of(&self, event_type: &str) -> Vec<serde_json::Value> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|envelope| envelope.event_type == event_type)
            .map(|envelope| envelope.payload.clone())
            .collect()
    }

    /// Counts envelopes with the given event type.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn count_of(&self, event_type: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|envelope| envelope.event_type == event_type)
            .count()
    }
}

impl EventSink for RecordingEventSink {
    fn publish(&self, envelope: &EventEnvelope) {
        self.published.lock().unwrap().push(envelope.clone());
    }
}
