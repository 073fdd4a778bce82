//! Outbound breaker events.
//!
//! The presentation layer turns these into user-facing messages ("cognitive
//! break recommended") or routing decisions. Sinks must not block: they are
//! called while the session lock is held.

use std::sync::{Mutex, PoisonError};
use tokio::sync::mpsc;
use tracing::warn;

use crate::domain::models::BreakerEvent;

/// Receiver of breaker transitions.
pub trait BreakerEventSink: Send + Sync {
    fn publish(&self, event: &BreakerEvent);
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEventSink;

impl BreakerEventSink for NullEventSink {
    fn publish(&self, _event: &BreakerEvent) {}
}

/// Keeps every event in memory, in publication order.
#[derive(Debug, Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<BreakerEvent>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<BreakerEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl BreakerEventSink for RecordingEventSink {
    fn publish(&self, event: &BreakerEvent) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}

/// Forwards events into a bounded channel; a full or closed channel drops
/// the event with a warning.
impl BreakerEventSink for mpsc::Sender<BreakerEvent> {
    fn publish(&self, event: &BreakerEvent) {
        if let Err(err) = self.try_send(event.clone()) {
            warn!(
                transition = ?event.transition,
                scope = %event.scope,
                error = %err,
                "dropping breaker event"
            );
        }
    }
}
