//! Multi-channel notification dispatch
//!
//! Sends an emergency payload through an ordered pipeline: primary remote
//! endpoint, fallback providers, per-contact messages, push, and a local
//! banner. Channel attempts are sequential so the primary/fallback
//! relationship stays deterministic; contact sends run concurrently since
//! contacts are independent. Partial failure in the side channels never
//! suppresses the core success signal, and every attempt lands in the
//! report.

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::contacts::EmergencyContact;
use crate::events::EmergencyEvent;
use crate::Result;

/// Payload handed to every notification channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    /// The emergency being dispatched
    pub event: EmergencyEvent,
}

impl AlertPayload {
    /// Wrap an event for transmission
    pub fn new(event: EmergencyEvent) -> Self {
        Self { event }
    }

    /// Key/value JSON form for wire transmission
    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

/// One notification delivery mechanism, injected by the host
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Stable channel name used in dispatch reports
    fn name(&self) -> &str;

    /// Attempt one delivery of the payload
    async fn send(&self, payload: &AlertPayload) -> Result<()>;
}

/// SMS-like transport for per-contact messages, injected by the host
#[async_trait]
pub trait ContactMessenger: Send + Sync {
    /// Deliver a formatted message to one contact
    async fn send_to_contact(&self, contact: &EmergencyContact, message: &str) -> Result<()>;
}

/// Outcome of one channel attempt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelOutcome {
    /// Channel name, e.g. "primary_api" or "contact:911"
    pub channel: String,

    /// Whether the attempt succeeded
    pub succeeded: bool,

    /// Failure detail, when the attempt failed
    pub error: Option<String>,
}

impl ChannelOutcome {
    fn ok(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            succeeded: true,
            error: None,
        }
    }

    fn failed(channel: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            succeeded: false,
            error: Some(error.into()),
        }
    }
}

/// Per-channel record of one dispatch run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchReport {
    /// Every attempted channel, in attempt order
    pub outcomes: Vec<ChannelOutcome>,

    /// True iff the primary endpoint or some fallback provider succeeded
    pub delivered: bool,
}

impl DispatchReport {
    /// Outcomes for failed attempts only
    pub fn failures(&self) -> impl Iterator<Item = &ChannelOutcome> {
        self.outcomes.iter().filter(|o| !o.succeeded)
    }
}

/// Deterministic contact-message template: pure function of event + contact
pub fn format_contact_message(event: &EmergencyEvent, contact: &EmergencyContact) -> String {
    let (location_line, map_line) = match event.location {
        Some(point) => (
            format!("{}, {}", point.latitude, point.longitude),
            format!("https://maps.google.com/?q={},{}", point.latitude, point.longitude),
        ),
        None => ("unknown".to_string(), "unavailable".to_string()),
    };
    format!(
        "🚨 EMERGENCY ALERT 🚨\n\
         To: {} ({})\n\
         Type: {}\n\
         Location: {}\n\
         Map: {}\n\
         Time: {}\n\
         Message: {}\n\
         Please respond immediately!",
        contact.name,
        contact.relationship,
        event.kind.to_string().to_uppercase(),
        location_line,
        map_line,
        event.created_at.to_rfc3339(),
        event.message,
    )
}

/// Ordered multi-channel dispatcher with fallback
pub struct Dispatcher {
    primary: Arc<dyn NotificationChannel>,
    fallbacks: Vec<Arc<dyn NotificationChannel>>,
    messenger: Arc<dyn ContactMessenger>,
    push: Option<Arc<dyn NotificationChannel>>,
    banner: Option<Arc<dyn NotificationChannel>>,
}

impl Dispatcher {
    /// Create a dispatcher with a primary channel and contact messenger
    pub fn new(
        primary: Arc<dyn NotificationChannel>,
        messenger: Arc<dyn ContactMessenger>,
    ) -> Self {
        Self {
            primary,
            fallbacks: Vec::new(),
            messenger,
            push: None,
            banner: None,
        }
    }

    /// Append a fallback provider; fallbacks are tried in insertion order
    pub fn with_fallback(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.fallbacks.push(channel);
        self
    }

    /// Attach a best-effort push channel
    pub fn with_push(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.push = Some(channel);
        self
    }

    /// Attach a best-effort local banner channel
    pub fn with_banner(mut self, channel: Arc<dyn NotificationChannel>) -> Self {
        self.banner = Some(channel);
        self
    }

    /// Run the full pipeline for one event.
    ///
    /// `delivered` in the returned report is true iff the primary endpoint
    /// or some fallback provider accepted the payload. Contact, push and
    /// banner attempts never affect it but are always attempted and
    /// recorded.
    pub async fn dispatch(
        &self,
        event: &EmergencyEvent,
        contacts: &[EmergencyContact],
    ) -> DispatchReport {
        let payload = AlertPayload::new(event.clone());
        let mut outcomes = Vec::new();

        // 1. Primary endpoint, one attempt, no retry
        let mut delivered = match self.primary.send(&payload).await {
            Ok(()) => {
                tracing::info!(channel = self.primary.name(), "primary dispatch delivered");
                outcomes.push(ChannelOutcome::ok(self.primary.name()));
                true
            }
            Err(e) => {
                tracing::warn!(channel = self.primary.name(), error = %e, "primary dispatch failed");
                outcomes.push(ChannelOutcome::failed(self.primary.name(), e.to_string()));
                false
            }
        };

        // 2. Fallback providers in order, stopping at the first success
        if !delivered {
            for fallback in &self.fallbacks {
                match fallback.send(&payload).await {
                    Ok(()) => {
                        tracing::info!(channel = fallback.name(), "fallback dispatch delivered");
                        outcomes.push(ChannelOutcome::ok(fallback.name()));
                        delivered = true;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(channel = fallback.name(), error = %e, "fallback dispatch failed");
                        outcomes.push(ChannelOutcome::failed(fallback.name(), e.to_string()));
                    }
                }
            }
        }

        // 3. Contacts, ascending priority; failures isolated per contact
        let contact_sends = contacts.iter().map(|contact| async move {
            let message = format_contact_message(event, contact);
            let channel = format!("contact:{}", contact.phone);
            match self.messenger.send_to_contact(contact, &message).await {
                Ok(()) => ChannelOutcome::ok(channel),
                Err(e) => {
                    tracing::warn!(phone = %contact.phone, error = %e, "contact message failed");
                    ChannelOutcome::failed(channel, e.to_string())
                }
            }
        });
        outcomes.extend(join_all(contact_sends).await);

        // 4/5. Best-effort local channels; absence is a no-op
        for channel in [self.push.as_ref(), self.banner.as_ref()].into_iter().flatten() {
            match channel.send(&payload).await {
                Ok(()) => outcomes.push(ChannelOutcome::ok(channel.name())),
                Err(e) => {
                    tracing::debug!(channel = channel.name(), error = %e, "local channel failed");
                    outcomes.push(ChannelOutcome::failed(channel.name(), e.to_string()));
                }
            }
        }

        DispatchReport {
            outcomes,
            delivered,
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("primary", &self.primary.name())
            .field(
                "fallbacks",
                &self.fallbacks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .field("push", &self.push.as_ref().map(|c| c.name()))
            .field("banner", &self.banner.as_ref().map(|c| c.name()))
            .finish_non_exhaustive()
    }
}

/// Channel that logs the payload and always succeeds
#[derive(Debug, Clone)]
pub struct LoggingChannel {
    name: String,
}

impl LoggingChannel {
    /// Create a logging channel with the given report name
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl NotificationChannel for LoggingChannel {
    fn name(&self) -> &str {
        &self.name
    }

    async fn send(&self, payload: &AlertPayload) -> Result<()> {
        tracing::info!(
            channel = %self.name,
            kind = %payload.event.kind,
            "alert payload accepted"
        );
        Ok(())
    }
}

/// Messenger that logs each contact message and always succeeds
#[derive(Debug, Clone, Default)]
pub struct LoggingMessenger;

#[async_trait]
impl ContactMessenger for LoggingMessenger {
    async fn send_to_contact(&self, contact: &EmergencyContact, message: &str) -> Result<()> {
        tracing::info!(to = %contact.phone, "contact message:\n{message}");
        Ok(())
    }
}
