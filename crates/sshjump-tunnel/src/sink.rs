//! Log destinations for tunnel events
//!
//! Sinks are written to concurrently from every forwarder task and are never
//! consulted for control decisions.

use std::sync::{Mutex, MutexGuard};

use sshjump_proto::{SessionId, TunnelEvent};
use tracing::{info, warn};

pub trait EventSink: Send + Sync {
    fn record(&self, event: TunnelEvent);
}

/// Emits each event through `tracing`; the subscriber decides where it lands
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn record(&self, event: TunnelEvent) {
        match (event.session(), event.is_failure()) {
            (Some(session), true) => warn!(session, "{}", event),
            (Some(session), false) => info!(session, "{}", event),
            (None, _) => info!("{}", event),
        }
    }
}

/// Keeps events in memory, in the order they were recorded
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<TunnelEvent>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<TunnelEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn events(&self) -> Vec<TunnelEvent> {
        self.lock().clone()
    }

    pub fn session_events(&self, session: SessionId) -> Vec<TunnelEvent> {
        self.lock()
            .iter()
            .filter(|e| e.session() == Some(session))
            .cloned()
            .collect()
    }

    pub fn count(&self, predicate: impl Fn(&TunnelEvent) -> bool) -> usize {
        self.lock().iter().filter(|e| predicate(e)).count()
    }

    /// Rendered messages, as a log file would show them
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(ToString::to_string).collect()
    }
}

impl EventSink for MemorySink {
    fn record(&self, event: TunnelEvent) {
        self.lock().push(event);
    }
}
