//! Lifeline Core - automated emergency response coordination
//!
//! Lifeline detects an emergency trigger (an inbound message or a manual
//! report), resolves the nearest responder services for the reporter's
//! location, and dispatches notifications across multiple channels with
//! fallback, while recording an auditable event history.
//!
//! # Architecture
//!
//! The core is five components, leaf-first:
//!
//! 1. **Geo index** (`geo`): static responder registry with haversine
//!    distance and three ranking policies (KNN, radius cutoff, weighted KNN)
//! 2. **Trigger matcher** (`trigger`): keyword × sender rules over
//!    unstructured inbound text
//! 3. **Dispatcher** (`dispatch`): ordered channel pipeline with fallback
//!    and per-channel failure isolation
//! 4. **Event log** (`events`): append-only bounded audit history
//! 5. **Alert coordinator** (`coordinator`): the lifecycle state machine
//!    tying them together
//!
//! External collaborators are traits the host injects: a
//! [`location::LocationProvider`], a [`store::PersistentStore`], and the
//! [`dispatch::NotificationChannel`]/[`dispatch::ContactMessenger`]
//! transports. Presentation layers observe through the [`bus::EventBus`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use lifeline_core::config::CoreConfig;
//! use lifeline_core::coordinator::AlertCoordinator;
//! use lifeline_core::dispatch::{Dispatcher, LoggingChannel, LoggingMessenger};
//! use lifeline_core::geo::GeoIndex;
//! use lifeline_core::location::FixedLocationProvider;
//! use lifeline_core::store::MemoryStore;
//! use lifeline_core::trigger::InboundMessage;
//!
//! # async fn run() -> lifeline_core::Result<()> {
//! let dispatcher = Dispatcher::new(
//!     Arc::new(LoggingChannel::new("primary_api")),
//!     Arc::new(LoggingMessenger),
//! );
//! let mut coordinator = AlertCoordinator::new(
//!     CoreConfig::default(),
//!     GeoIndex::with_default_registry(),
//!     dispatcher,
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0)),
//! )
//! .await?;
//!
//! let message = InboundMessage::new("m1", "911", "EMERGENCY: crash detected");
//! if let Some(session) = coordinator.handle_message(&message).await? {
//!     println!("session {} reached {:?}", session.id, session.state);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Design Principles
//!
//! 1. **No fatal errors in the flow**: an emergency session always reaches
//!    a terminal, auditable state, even under total network failure
//! 2. **Degrade, don't block**: a missing position fix or a failed channel
//!    narrows the response, it never stops it
//! 3. **Explicit collaborators**: no hidden global state; storage, location
//!    and transports are injected and owned by the coordinator's host

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod bus;
pub mod config;
pub mod contacts;
pub mod coordinator;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod geo;
pub mod location;
pub mod store;
pub mod trigger;

// Re-export commonly used types for convenience
pub use bus::{CoordinatorEvent, EventBus};
pub use config::CoreConfig;
pub use contacts::{ContactBook, EmergencyContact};
pub use coordinator::{AlertCoordinator, AlertSession, AlertState, SafetyHandle};
pub use dispatch::{
    AlertPayload, ChannelOutcome, ContactMessenger, DispatchReport, Dispatcher,
    NotificationChannel,
};
pub use error::{LifelineError, Result};
pub use events::{EmergencyEvent, EmergencyKind, EventLog, EventSource, GeoPoint, Severity};
pub use geo::{Coordinates, GeoIndex, RankedService, ServiceCategory, ServiceLocation};
pub use location::{LocationProvider, PositionFix};
pub use store::{FileStore, MemoryStore, PersistentStore};
pub use trigger::{InboundMessage, TriggerMatcher, TriggerRule};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod integration_tests {
    use super::*;
    use crate::dispatch::{LoggingChannel, LoggingMessenger};
    use crate::location::FixedLocationProvider;
    use std::sync::Arc;

    async fn coordinator(store: Arc<MemoryStore>) -> AlertCoordinator {
        let dispatcher = Dispatcher::new(
            Arc::new(LoggingChannel::new("primary_api")),
            Arc::new(LoggingMessenger),
        )
        .with_fallback(Arc::new(LoggingChannel::new("provider_1")))
        .with_banner(Arc::new(LoggingChannel::new("banner")));

        AlertCoordinator::new(
            CoreConfig::default(),
            GeoIndex::with_default_registry(),
            dispatcher,
            store,
            Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0)),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_message_flow() {
        let store = Arc::new(MemoryStore::new());
        let mut coordinator = coordinator(store.clone()).await;

        let message = InboundMessage::new(
            "sms-1",
            "GSM_MODULE",
            "EMERGENCY: Accident detected! Driver needs immediate assistance.",
        );
        let session = coordinator
            .handle_message(&message)
            .await
            .unwrap()
            .expect("default rules match this message");

        // Terminal state with ranked services from the (16.31, 80.44) origin
        assert_eq!(session.state, AlertState::Resolved);
        assert_eq!(session.ranked_hospitals.len(), 3);
        assert_eq!(session.ranked_police.len(), 3);
        assert!(session.report.unwrap().delivered);

        // The audit entry survives a coordinator restart over the same store
        drop(coordinator);
        let restarted = self::coordinator(store).await;
        assert_eq!(restarted.event_log().len(), 1);
    }

    #[tokio::test]
    async fn test_full_session_then_safety_then_new_session() {
        let store = Arc::new(MemoryStore::new());
        let mut coordinator = coordinator(store).await;

        let first = coordinator
            .trigger_manual(EmergencyKind::Accident, Severity::High, "first incident")
            .await
            .unwrap();
        assert_eq!(first.state, AlertState::Resolved);

        let safe = coordinator.confirm_safe().unwrap();
        assert_eq!(safe.state, AlertState::Safe);

        // Safe is terminal for that session; the next trigger starts fresh
        let second = coordinator
            .trigger_manual(EmergencyKind::Medical, Severity::Critical, "second incident")
            .await
            .unwrap();
        assert_ne!(second.id, first.id);
        assert_eq!(second.state, AlertState::Resolved);
        assert_eq!(coordinator.event_log().len(), 2);
    }
}
