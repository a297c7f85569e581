//! Emergency event records and the bounded audit log
//!
//! Every dispatched alert is appended to an [`EventLog`]: an append-only,
//! FIFO-bounded history used for audit and UI replay. Events are never
//! mutated once appended; on overflow the oldest entries are evicted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::store::PersistentStore;
use crate::Result;

/// Store key under which the event log persists itself
pub const EVENT_LOG_KEY: &str = "emergency_events";

/// Default maximum number of retained events
pub const DEFAULT_EVENT_CAP: usize = 100;

/// Kind of emergency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyKind {
    /// Traffic or workplace accident
    Accident,
    /// Medical emergency
    Medical,
    /// Fire
    Fire,
    /// Crime in progress
    Crime,
    /// Anything else
    Other,
}

impl std::fmt::Display for EmergencyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EmergencyKind::Accident => write!(f, "accident"),
            EmergencyKind::Medical => write!(f, "medical"),
            EmergencyKind::Fire => write!(f, "fire"),
            EmergencyKind::Crime => write!(f, "crime"),
            EmergencyKind::Other => write!(f, "other"),
        }
    }
}

/// How the emergency entered the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventSource {
    /// Matched from an inbound message
    Message,
    /// Manually reported by the user
    Manual,
    /// Raised by an automatic detector
    Automatic,
}

/// Severity of the emergency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational
    Low,
    /// Needs attention
    Medium,
    /// Urgent
    High,
    /// Life-threatening
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Low => write!(f, "low"),
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// A reported position, possibly with an accuracy estimate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in signed degrees
    pub latitude: f64,
    /// Longitude in signed degrees
    pub longitude: f64,
    /// Horizontal accuracy in meters, when the fix reports one
    pub accuracy_m: Option<f64>,
}

/// Immutable record of one emergency, appended to the log at dispatch time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmergencyEvent {
    /// Monotonic, timestamp-derived identifier
    pub id: String,

    /// Kind of emergency
    pub kind: EmergencyKind,

    /// Where it happened, when a fix was available
    pub location: Option<GeoPoint>,

    /// Free-text description or the triggering message body
    pub message: String,

    /// When the event was created
    pub created_at: DateTime<Utc>,

    /// How the emergency entered the system
    pub source: EventSource,

    /// Severity of the emergency
    pub severity: Severity,
}

// Disambiguates events created within the same millisecond
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

impl EmergencyEvent {
    /// Create an event stamped with the current instant and a fresh id
    pub fn new(
        kind: EmergencyKind,
        message: impl Into<String>,
        source: EventSource,
        severity: Severity,
    ) -> Self {
        let created_at = Utc::now();
        let seq = EVENT_SEQ.fetch_add(1, Ordering::Relaxed);
        Self {
            id: format!("{}-{}", created_at.timestamp_millis(), seq),
            kind,
            location: None,
            message: message.into(),
            created_at,
            source,
            severity,
        }
    }

    /// Attach a resolved location
    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }
}

/// Append-only bounded history of dispatched alerts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLog {
    events: VecDeque<EmergencyEvent>,
    cap: usize,
}

impl EventLog {
    /// Create an empty log with the given capacity
    pub fn new(cap: usize) -> Self {
        Self {
            events: VecDeque::new(),
            cap,
        }
    }

    /// Append an event, evicting from the head once over capacity
    pub fn append(&mut self, event: EmergencyEvent) {
        self.events.push_back(event);
        while self.events.len() > self.cap {
            self.events.pop_front();
        }
    }

    /// The `n` most recent events, most recent first
    pub fn recent(&self, n: usize) -> Vec<&EmergencyEvent> {
        self.events.iter().rev().take(n).collect()
    }

    /// Remove all events
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Number of retained events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Load a log from the store, or an empty one when nothing is saved
    pub async fn load(store: &dyn PersistentStore, cap: usize) -> Result<Self> {
        match store.get(EVENT_LOG_KEY).await? {
            Some(bytes) => {
                let mut log: Self = serde_json::from_slice(&bytes)?;
                log.cap = cap;
                while log.events.len() > log.cap {
                    log.events.pop_front();
                }
                Ok(log)
            }
            None => Ok(Self::new(cap)),
        }
    }

    /// Persist the whole log
    pub async fn save(&self, store: &dyn PersistentStore) -> Result<()> {
        store
            .set(EVENT_LOG_KEY, serde_json::to_vec(self)?)
            .await
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_CAP)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn event(message: &str) -> EmergencyEvent {
        EmergencyEvent::new(
            EmergencyKind::Accident,
            message,
            EventSource::Manual,
            Severity::High,
        )
    }

    #[test]
    fn test_event_ids_are_unique_and_monotonic() {
        let a = event("first");
        let b = event("second");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_append_evicts_oldest_beyond_cap() {
        let mut log = EventLog::new(100);
        for i in 0..101 {
            log.append(event(&format!("event {i}")));
        }
        assert_eq!(log.len(), 100);

        // Oldest (event 0) is gone, newest is last appended
        let recent = log.recent(100);
        assert_eq!(recent.len(), 100);
        assert_eq!(recent[0].message, "event 100");
        assert_eq!(recent[99].message, "event 1");
    }

    #[test]
    fn test_recent_is_most_recent_first() {
        let mut log = EventLog::new(10);
        log.append(event("a"));
        log.append(event("b"));
        log.append(event("c"));

        let recent = log.recent(2);
        assert_eq!(recent[0].message, "c");
        assert_eq!(recent[1].message, "b");
        assert_eq!(log.len(), 3, "recent() must not mutate");
    }

    #[test]
    fn test_clear() {
        let mut log = EventLog::new(10);
        log.append(event("a"));
        log.clear();
        assert!(log.is_empty());
    }

    #[tokio::test]
    async fn test_persistence_roundtrip() {
        let store = MemoryStore::new();
        let mut log = EventLog::new(10);
        log.append(event("persisted"));
        log.save(&store).await.unwrap();

        let loaded = EventLog::load(&store, 10).await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.recent(1)[0].message, "persisted");
    }

    #[tokio::test]
    async fn test_load_empty_store_gives_empty_log() {
        let store = MemoryStore::new();
        let log = EventLog::load(&store, 5).await.unwrap();
        assert!(log.is_empty());
    }
}
