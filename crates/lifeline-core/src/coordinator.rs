//! Alert lifecycle coordination
//!
//! The coordinator owns the alert state machine: it consumes trigger and
//! manual events, resolves a position, queries the geo index, runs the
//! dispatch pipeline and appends the result to the audit log. One session
//! is active at a time; duplicate triggers coalesce into it. A safety
//! confirmation wins from any state and cancels in-flight work.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::bus::{CoordinatorEvent, EventBus};
use crate::config::CoreConfig;
use crate::contacts::{ContactBook, EmergencyContact};
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::events::{EmergencyEvent, EmergencyKind, EventLog, EventSource, GeoPoint, Severity};
use crate::geo::{Coordinates, GeoIndex, RankedService, ServiceCategory};
use crate::location::LocationProvider;
use crate::store::PersistentStore;
use crate::trigger::{InboundMessage, TriggerMatcher, TriggerRule};
use crate::{LifelineError, Result};

/// Lifecycle state of one alert session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertState {
    /// No emergency in flight
    Idle,
    /// Trigger detected, originating event recorded
    Triggered,
    /// Waiting for a position fix
    Locating,
    /// Position resolved (or given up on)
    Located,
    /// Notification pipeline running
    Dispatching,
    /// Dispatch finished and logged
    Resolved,
    /// User confirmed safety; terminal
    Safe,
}

impl AlertState {
    /// Whether this state ends the session
    pub fn is_terminal(self) -> bool {
        matches!(self, AlertState::Resolved | AlertState::Safe)
    }

    /// Whether a session may move from `self` to `to`.
    ///
    /// The pipeline is strictly ordered; the only shortcut is that safety
    /// confirmation reaches `Safe` from any non-idle state.
    pub fn can_advance_to(self, to: AlertState) -> bool {
        use AlertState::*;
        match (self, to) {
            (Idle, Triggered)
            | (Triggered, Locating)
            | (Locating, Located)
            | (Located, Dispatching)
            | (Dispatching, Resolved) => true,
            (from, Safe) => from != Idle,
            _ => false,
        }
    }
}

/// Mutable coordination state for one in-flight emergency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSession {
    /// Session identifier
    pub id: Uuid,

    /// Current lifecycle state
    pub state: AlertState,

    /// The originating emergency event
    pub event: EmergencyEvent,

    /// Resolved position, filled after locating
    pub location: Option<GeoPoint>,

    /// Nearest hospitals, filled after the geo query
    pub ranked_hospitals: Vec<RankedService>,

    /// Nearest police stations, filled after the geo query
    pub ranked_police: Vec<RankedService>,

    /// Per-channel dispatch outcomes, filled after dispatch
    pub report: Option<DispatchReport>,

    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl AlertSession {
    /// Create a session in the `Triggered` state for an event
    pub fn new(event: EmergencyEvent) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: AlertState::Triggered,
            event,
            location: None,
            ranked_hospitals: Vec::new(),
            ranked_police: Vec::new(),
            report: None,
            started_at: Utc::now(),
        }
    }
}

/// Clonable handle that confirms safety from outside the coordinator.
///
/// Firing it cancels the in-flight pipeline for the active session; late
/// results of cancelled work are discarded, never logged.
#[derive(Debug, Clone)]
pub struct SafetyHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl SafetyHandle {
    /// Confirm safety for the active session
    pub fn confirm(&self) {
        let _ = self.tx.send(true);
    }
}

/// The orchestrator tying trigger matching, geo ranking, dispatch and the
/// audit log together under one state machine
pub struct AlertCoordinator {
    config: CoreConfig,
    geo: GeoIndex,
    matcher: TriggerMatcher,
    contacts: ContactBook,
    dispatcher: Dispatcher,
    log: EventLog,
    store: Arc<dyn PersistentStore>,
    location: Arc<dyn LocationProvider>,
    bus: EventBus,
    session: Option<AlertSession>,
    cancel_tx: Arc<watch::Sender<bool>>,
    cancel_rx: watch::Receiver<bool>,
}

impl AlertCoordinator {
    /// Build a coordinator, loading contacts, trigger rules and the event
    /// log from the injected store (seeding defaults on first run)
    pub async fn new(
        config: CoreConfig,
        geo: GeoIndex,
        dispatcher: Dispatcher,
        store: Arc<dyn PersistentStore>,
        location: Arc<dyn LocationProvider>,
    ) -> Result<Self> {
        let matcher = TriggerMatcher::load(store.as_ref()).await?;
        let contacts = ContactBook::load(store.as_ref()).await?;
        let log = EventLog::load(store.as_ref(), config.event_log_cap).await?;
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let bus = EventBus::new(config.bus_capacity);
        let geo = geo.with_priority_weight(config.priority_weight);

        Ok(Self {
            config,
            geo,
            matcher,
            contacts,
            dispatcher,
            log,
            store,
            location,
            bus,
            session: None,
            cancel_tx: Arc::new(cancel_tx),
            cancel_rx,
        })
    }

    /// The bus presentation layers subscribe to
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// A handle for confirming safety from another task
    pub fn safety_handle(&self) -> SafetyHandle {
        SafetyHandle {
            tx: Arc::clone(&self.cancel_tx),
        }
    }

    /// Snapshot of the active session, if any
    pub fn session(&self) -> Option<&AlertSession> {
        self.session.as_ref()
    }

    /// The geo index used for service ranking
    pub fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    /// The audit log
    pub fn event_log(&self) -> &EventLog {
        &self.log
    }

    /// Contacts in dispatch order
    pub fn contacts(&self) -> &[EmergencyContact] {
        self.contacts.all()
    }

    /// Trigger rules in insertion order
    pub fn trigger_rules(&self) -> &[TriggerRule] {
        self.matcher.rules()
    }

    /// Add a contact and persist the book
    pub async fn add_contact(&mut self, contact: EmergencyContact) -> Result<()> {
        self.contacts.add(contact);
        self.contacts.save(self.store.as_ref()).await
    }

    /// Remove a contact by phone and persist the book
    pub async fn remove_contact(&mut self, phone: &str) -> Result<EmergencyContact> {
        let removed = self.contacts.remove(phone)?;
        self.contacts.save(self.store.as_ref()).await?;
        Ok(removed)
    }

    /// Add a trigger rule and persist the rule set
    pub async fn add_trigger_rule(&mut self, rule: TriggerRule) -> Result<()> {
        self.matcher.add_rule(rule);
        self.matcher.save(self.store.as_ref()).await
    }

    /// Remove a trigger rule by index and persist the rule set
    pub async fn remove_trigger_rule(&mut self, index: usize) -> Result<TriggerRule> {
        let removed = self.matcher.remove_rule(index)?;
        self.matcher.save(self.store.as_ref()).await?;
        Ok(removed)
    }

    /// Classify an inbound message and, on a trigger match, run the full
    /// alert pipeline to its terminal state.
    ///
    /// Returns `None` when the message is not an emergency. A match while
    /// a session is still in flight coalesces: the duplicate is ignored
    /// and the active session snapshot is returned.
    pub async fn handle_message(&mut self, message: &InboundMessage) -> Result<Option<AlertSession>> {
        if !self.matcher.evaluate(&message.sender, &message.body) {
            tracing::debug!(sender = %message.sender, "message did not match any trigger rule");
            return Ok(None);
        }
        tracing::info!(sender = %message.sender, "emergency trigger matched");

        let event = EmergencyEvent::new(
            EmergencyKind::Accident,
            message.body.clone(),
            EventSource::Message,
            Severity::Critical,
        );
        self.run_session(event).await.map(Some)
    }

    /// Manually report an emergency and run the pipeline to its terminal
    /// state, coalescing into any in-flight session
    pub async fn trigger_manual(
        &mut self,
        kind: EmergencyKind,
        severity: Severity,
        message: impl Into<String>,
    ) -> Result<AlertSession> {
        let event = EmergencyEvent::new(kind, message.into(), EventSource::Manual, severity);
        self.run_session(event).await
    }

    /// Confirm safety: the active session jumps to `Safe` from whatever
    /// state it is in and any in-flight work is cancelled. Returns the
    /// terminal snapshot, or `None` when no session is active.
    pub fn confirm_safe(&mut self) -> Option<AlertSession> {
        let _ = self.cancel_tx.send(true);
        let state = self.session.as_ref().map(|s| s.state);
        if let Some(state) = state {
            if state != AlertState::Safe {
                tracing::info!(from = ?state, "safety confirmed");
                self.set_state(AlertState::Safe);
            }
        }
        self.session.clone()
    }

    /// Start (or coalesce) a session for `event` and drive it to a
    /// terminal state.
    ///
    /// The `&mut self` borrow serializes triggers, so a non-terminal
    /// session is only found here when a caller dropped the driving future
    /// mid-pipeline. The duplicate then coalesces into that session
    /// instead of starting a second dispatch for the same emergency.
    async fn run_session(&mut self, event: EmergencyEvent) -> Result<AlertSession> {
        if let Some(active) = &self.session {
            if !active.state.is_terminal() {
                tracing::warn!(
                    session = %active.id,
                    "trigger ignored: session already in flight"
                );
                return Ok(active.clone());
            }
        }

        // Fresh session: reset the safety signal and enter Triggered
        let _ = self.cancel_tx.send(false);
        self.cancel_rx.borrow_and_update();
        let session = AlertSession::new(event);
        tracing::info!(session = %session.id, kind = %session.event.kind, "alert session started");
        self.session = Some(session);
        self.publish_state();

        self.advance_pipeline().await?;
        self.session
            .clone()
            .ok_or_else(|| LifelineError::Internal("session vanished mid-pipeline".to_string()))
    }

    /// Drive the active session from `Triggered` to `Resolved` or `Safe`
    async fn advance_pipeline(&mut self) -> Result<()> {
        let mut cancel = self.cancel_rx.clone();

        // Triggered -> Locating
        if self.cancelled() {
            self.set_state(AlertState::Safe);
            return Ok(());
        }
        self.set_state(AlertState::Locating);

        // Locating -> Located: a fix, or None after timeout/failure
        let provider = Arc::clone(&self.location);
        let timeout = Duration::from_millis(self.config.location_timeout_ms);
        let high_accuracy = self.config.high_accuracy;
        let fix = tokio::select! {
            _ = wait_for_cancel(&mut cancel) => {
                tracing::info!("location request cancelled by safety confirmation");
                self.set_state(AlertState::Safe);
                return Ok(());
            }
            outcome = tokio::time::timeout(timeout, provider.current_position(high_accuracy)) => {
                match outcome {
                    Ok(Ok(fix)) => Some(fix),
                    Ok(Err(e)) => {
                        tracing::warn!(error = %e, "location provider failed, proceeding without a fix");
                        None
                    }
                    Err(_) => {
                        tracing::warn!("location request timed out, proceeding without a fix");
                        None
                    }
                }
            }
        };

        if let Some(session) = self.session.as_mut() {
            session.location = fix.map(GeoPoint::from);
            session.event.location = session.location;
        }
        self.set_state(AlertState::Located);

        // Located -> Dispatching: geo query only with a position. A
        // malformed fix degrades to no ranking, it never aborts the flow.
        let origin = self
            .session
            .as_ref()
            .and_then(|s| s.location)
            .and_then(|point| {
                Coordinates::new(point.latitude, point.longitude)
                    .map_err(|e| tracing::warn!(error = %e, "discarding malformed position fix"))
                    .ok()
            });
        if let Some(origin) = origin {
            let kind = self
                .session
                .as_ref()
                .map(|s| s.event.kind)
                .unwrap_or(EmergencyKind::Other);
            let priority = match kind {
                EmergencyKind::Medical => Some(ServiceCategory::Hospital),
                EmergencyKind::Crime => Some(ServiceCategory::Police),
                _ => None,
            };
            let k = self.config.nearest_k;
            let hospitals =
                self.geo
                    .weighted_nearest(origin, ServiceCategory::Hospital, k, priority);
            let police = self
                .geo
                .weighted_nearest(origin, ServiceCategory::Police, k, priority);
            if let Some(session) = self.session.as_mut() {
                session.ranked_hospitals = hospitals;
                session.ranked_police = police;
            }
        } else {
            tracing::warn!("no usable position fix; dispatching without ranked services");
        }
        self.set_state(AlertState::Dispatching);

        // Dispatching -> Resolved, unless safety wins first
        let event = match self.session.as_ref() {
            Some(session) => session.event.clone(),
            None => return Ok(()),
        };
        let report = tokio::select! {
            _ = wait_for_cancel(&mut cancel) => None,
            report = self.dispatcher.dispatch(&event, self.contacts.all()) => Some(report),
        };
        let Some(report) = report else {
            tracing::info!("dispatch cancelled by safety confirmation, report discarded");
            self.set_state(AlertState::Safe);
            return Ok(());
        };

        let session_id = self.session.as_ref().map(|s| s.id);
        if let Some(session) = self.session.as_mut() {
            session.report = Some(report.clone());
        }

        // The append happens exactly once per session, success or failure
        self.log.append(event);
        if let Err(e) = self.log.save(self.store.as_ref()).await {
            tracing::warn!(error = %e, "failed to persist event log");
        }
        self.set_state(AlertState::Resolved);
        if let Some(session_id) = session_id {
            self.bus.publish(CoordinatorEvent::DispatchCompleted {
                session_id,
                report,
            });
        }
        Ok(())
    }

    fn cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }

    /// Move the active session to `state` and publish the snapshot
    fn set_state(&mut self, state: AlertState) {
        if let Some(session) = self.session.as_mut() {
            debug_assert!(
                session.state.can_advance_to(state),
                "invalid transition {:?} -> {:?}",
                session.state,
                state
            );
            session.state = state;
            tracing::debug!(session = %session.id, state = ?state, "state transition");
        }
        self.publish_state();
    }

    fn publish_state(&self) {
        if let Some(session) = &self.session {
            self.bus.publish(CoordinatorEvent::AlertStateChanged {
                session: session.clone(),
            });
        }
    }
}

impl std::fmt::Debug for AlertCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AlertCoordinator")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}

/// Resolve once the safety signal fires; pends forever otherwise
async fn wait_for_cancel(rx: &mut watch::Receiver<bool>) {
    loop {
        if *rx.borrow_and_update() {
            return;
        }
        if rx.changed().await.is_err() {
            // Sender gone: safety can no longer be confirmed
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{AlertPayload, LoggingChannel, LoggingMessenger, NotificationChannel};
    use crate::location::{FixedLocationProvider, PositionFix, PositionWatch};
    use crate::store::MemoryStore;
    use async_trait::async_trait;

    /// Provider that never produces a fix, to exercise the timeout path
    struct NeverLocationProvider;

    #[async_trait]
    impl LocationProvider for NeverLocationProvider {
        async fn current_position(&self, _high_accuracy: bool) -> Result<PositionFix> {
            std::future::pending().await
        }

        async fn watch_position(&self, _interval: Duration) -> Result<PositionWatch> {
            let (_tx, rx) = tokio::sync::mpsc::channel(1);
            let task = tokio::spawn(async {});
            Ok(PositionWatch::new(rx, task))
        }
    }

    /// Channel that always fails
    struct DeadChannel;

    #[async_trait]
    impl NotificationChannel for DeadChannel {
        fn name(&self) -> &str {
            "dead"
        }

        async fn send(&self, _payload: &AlertPayload) -> Result<()> {
            Err(LifelineError::ChannelError("unreachable".to_string()))
        }
    }

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(
            Arc::new(LoggingChannel::new("primary_api")),
            Arc::new(LoggingMessenger),
        )
    }

    async fn coordinator_with(
        location: Arc<dyn LocationProvider>,
        dispatcher: Dispatcher,
        timeout_ms: u64,
    ) -> AlertCoordinator {
        AlertCoordinator::new(
            CoreConfig::new().with_location_timeout_ms(timeout_ms),
            GeoIndex::with_default_registry(),
            dispatcher,
            Arc::new(MemoryStore::new()),
            location,
        )
        .await
        .unwrap()
    }

    #[test]
    fn test_transition_table() {
        use AlertState::*;
        assert!(Idle.can_advance_to(Triggered));
        assert!(Triggered.can_advance_to(Locating));
        assert!(Locating.can_advance_to(Located));
        assert!(Located.can_advance_to(Dispatching));
        assert!(Dispatching.can_advance_to(Resolved));

        // No skipping
        assert!(!Triggered.can_advance_to(Resolved));
        assert!(!Locating.can_advance_to(Dispatching));

        // Safety wins from any non-idle state
        assert!(Locating.can_advance_to(Safe));
        assert!(Resolved.can_advance_to(Safe));
        assert!(!Idle.can_advance_to(Safe));
    }

    #[tokio::test]
    async fn test_message_trigger_reaches_resolved_with_ranked_services() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;

        let message = InboundMessage::new("m1", "911", "EMERGENCY: crash on highway");
        let session = coordinator
            .handle_message(&message)
            .await
            .unwrap()
            .expect("message should trigger");

        assert_eq!(session.state, AlertState::Resolved);
        assert_eq!(session.ranked_hospitals.len(), 3);
        assert_eq!(session.ranked_police.len(), 3);
        for pair in session.ranked_hospitals.windows(2) {
            assert!(pair[0].distance_km <= pair[1].distance_km);
        }
        assert!(session.report.as_ref().unwrap().delivered);

        // Exactly one audit entry
        assert_eq!(coordinator.event_log().len(), 1);
    }

    #[tokio::test]
    async fn test_non_emergency_message_is_ignored() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;

        let message = InboundMessage::new("m1", "555-1234", "let's grab lunch");
        let result = coordinator.handle_message(&message).await.unwrap();
        assert!(result.is_none());
        assert!(coordinator.session().is_none());
        assert!(coordinator.event_log().is_empty());
    }

    #[tokio::test]
    async fn test_location_timeout_degrades_to_locationless_dispatch() {
        let mut coordinator =
            coordinator_with(Arc::new(NeverLocationProvider), dispatcher(), 50).await;

        let session = coordinator
            .trigger_manual(EmergencyKind::Fire, Severity::High, "kitchen fire")
            .await
            .unwrap();

        assert_eq!(session.state, AlertState::Resolved);
        assert!(session.location.is_none());
        assert!(session.ranked_hospitals.is_empty());
        assert!(session.ranked_police.is_empty());
        assert_eq!(coordinator.event_log().len(), 1);
        assert_eq!(coordinator.event_log().recent(1)[0].location, None);
    }

    #[tokio::test]
    async fn test_total_dispatch_failure_still_resolves() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let failing = Dispatcher::new(Arc::new(DeadChannel), Arc::new(LoggingMessenger));
        let mut coordinator = coordinator_with(location, failing, 10_000).await;

        let session = coordinator
            .trigger_manual(EmergencyKind::Other, Severity::Medium, "unclear situation")
            .await
            .unwrap();

        assert_eq!(session.state, AlertState::Resolved);
        assert!(!session.report.as_ref().unwrap().delivered);
        assert_eq!(coordinator.event_log().len(), 1, "failure is still audited");
    }

    #[tokio::test]
    async fn test_safety_while_locating_cancels_without_logging() {
        let mut coordinator =
            coordinator_with(Arc::new(NeverLocationProvider), dispatcher(), 60_000).await;
        let handle = coordinator.safety_handle();
        let mut rx = coordinator.bus().subscribe();

        // Confirm safety as soon as the session reports Locating
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(CoordinatorEvent::AlertStateChanged { session })
                        if session.state == AlertState::Locating =>
                    {
                        handle.confirm();
                        break;
                    }
                    Ok(_) => continue,
                    Err(_) => break,
                }
            }
        });

        let session = coordinator
            .trigger_manual(EmergencyKind::Medical, Severity::Critical, "chest pain")
            .await
            .unwrap();

        assert_eq!(session.state, AlertState::Safe);
        assert!(session.report.is_none(), "no dispatch for a cancelled session");
        assert!(coordinator.event_log().is_empty(), "nothing audited");
    }

    #[tokio::test]
    async fn test_duplicate_triggers_coalesce_and_terminal_starts_fresh() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;

        let first = coordinator
            .trigger_manual(EmergencyKind::Accident, Severity::High, "first")
            .await
            .unwrap();
        assert!(first.state.is_terminal());

        // The prior session is terminal, so this starts a fresh one
        let second = coordinator
            .trigger_manual(EmergencyKind::Accident, Severity::High, "second")
            .await
            .unwrap();
        assert_ne!(first.id, second.id);
        assert_eq!(coordinator.event_log().len(), 2);
    }

    #[tokio::test]
    async fn test_trigger_coalesces_into_abandoned_in_flight_session() {
        let mut coordinator =
            coordinator_with(Arc::new(NeverLocationProvider), dispatcher(), 60_000).await;

        // Drop the driving future while the session is still locating
        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            coordinator.trigger_manual(EmergencyKind::Accident, Severity::High, "first"),
        )
        .await;
        assert!(abandoned.is_err());
        let stuck = coordinator.session().unwrap().clone();
        assert_eq!(stuck.state, AlertState::Locating);

        // The duplicate coalesces: same session back, nothing new audited
        let coalesced = coordinator
            .trigger_manual(EmergencyKind::Fire, Severity::Critical, "second")
            .await
            .unwrap();
        assert_eq!(coalesced.id, stuck.id);
        assert_eq!(coalesced.event.message, "first");
        assert!(coordinator.event_log().is_empty());

        // Safety confirmation still releases the stuck session
        let safe = coordinator.confirm_safe().unwrap();
        assert_eq!(safe.state, AlertState::Safe);
    }

    #[tokio::test]
    async fn test_config_priority_weight_reaches_geo_index() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let coordinator = AlertCoordinator::new(
            CoreConfig::new().with_priority_weight(0.25),
            GeoIndex::with_default_registry(),
            dispatcher(),
            Arc::new(MemoryStore::new()),
            location,
        )
        .await
        .unwrap();
        assert_eq!(coordinator.geo().priority_weight(), 0.25);
    }

    #[tokio::test]
    async fn test_confirm_safe_after_resolution() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;

        coordinator
            .trigger_manual(EmergencyKind::Crime, Severity::High, "break-in")
            .await
            .unwrap();
        let safe = coordinator.confirm_safe().unwrap();
        assert_eq!(safe.state, AlertState::Safe);

        // Still exactly one audit entry for the session
        assert_eq!(coordinator.event_log().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_safe_without_session() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;
        assert!(coordinator.confirm_safe().is_none());
    }

    #[tokio::test]
    async fn test_bus_observes_ordered_state_sequence() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;
        let mut rx = coordinator.bus().subscribe();

        coordinator
            .trigger_manual(EmergencyKind::Medical, Severity::Critical, "collapsed")
            .await
            .unwrap();

        let mut states = Vec::new();
        let mut completed = false;
        while let Ok(event) = rx.try_recv() {
            match event {
                CoordinatorEvent::AlertStateChanged { session } => states.push(session.state),
                CoordinatorEvent::DispatchCompleted { .. } => completed = true,
            }
        }
        assert_eq!(
            states,
            vec![
                AlertState::Triggered,
                AlertState::Locating,
                AlertState::Located,
                AlertState::Dispatching,
                AlertState::Resolved,
            ]
        );
        assert!(completed);
    }

    #[tokio::test]
    async fn test_medical_emergency_prioritizes_hospitals() {
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = coordinator_with(location, dispatcher(), 10_000).await;

        let session = coordinator
            .trigger_manual(EmergencyKind::Medical, Severity::Critical, "overdose")
            .await
            .unwrap();

        // Weighting only reorders; reported distances stay true
        for ranked in &session.ranked_hospitals {
            assert!(ranked.distance_km >= 0.0);
            assert_eq!(ranked.service.category, ServiceCategory::Hospital);
        }
    }

    #[tokio::test]
    async fn test_configuration_surface_persists() {
        let store = Arc::new(MemoryStore::new());
        let location = Arc::new(FixedLocationProvider::new(16.31, 80.44, 15.0));
        let mut coordinator = AlertCoordinator::new(
            CoreConfig::default(),
            GeoIndex::with_default_registry(),
            dispatcher(),
            store.clone(),
            location.clone(),
        )
        .await
        .unwrap();

        coordinator
            .add_contact(EmergencyContact::new("Alice", "555", "Family", 1))
            .await
            .unwrap();
        assert_eq!(coordinator.contacts().len(), 3);
        assert_eq!(coordinator.contacts()[0].phone, "555");

        // A new coordinator over the same store sees the mutation
        let reloaded = AlertCoordinator::new(
            CoreConfig::default(),
            GeoIndex::with_default_registry(),
            dispatcher(),
            store,
            location,
        )
        .await
        .unwrap();
        assert_eq!(reloaded.contacts().len(), 3);
    }
}
