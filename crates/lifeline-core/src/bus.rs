//! Observer bus for coordinator notifications
//!
//! Presentation layers subscribe here instead of being called back
//! directly; the coordinator publishes a snapshot on every state change
//! and a report when a dispatch completes. Built on `tokio::sync::broadcast`,
//! so slow subscribers lag rather than block the coordination flow.

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::coordinator::AlertSession;
use crate::dispatch::DispatchReport;

/// Default buffered events per subscriber
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Notification published by the coordinator
#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    /// An alert session entered a new state
    AlertStateChanged {
        /// Snapshot of the session after the transition
        session: AlertSession,
    },

    /// Dispatch finished for a session
    DispatchCompleted {
        /// Session the report belongs to
        session_id: Uuid,
        /// Per-channel outcomes
        report: DispatchReport,
    },
}

/// Broadcast bus connecting the coordinator to its observers
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<CoordinatorEvent>,
}

impl EventBus {
    /// Create a bus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Register an observer
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.tx.subscribe()
    }

    /// Publish an event; having no subscribers is not an error
    pub fn publish(&self, event: CoordinatorEvent) {
        let _ = self.tx.send(event);
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}
