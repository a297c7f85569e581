//! Keyword/sender trigger matching for inbound messages
//!
//! Classifies unstructured inbound text against a mutable set of trigger
//! rules. A message is an emergency iff some rule has both a keyword hit
//! (case-insensitive substring) and a sender hit (exact match or `"*"`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::PersistentStore;
use crate::{LifelineError, Result};

/// Store key under which trigger rules persist themselves
pub const TRIGGER_RULES_KEY: &str = "trigger_rules";

/// Sender pattern matching any sender
pub const WILDCARD_SENDER: &str = "*";

/// An inbound message to classify
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Message identifier assigned by the transport
    pub id: String,

    /// Sender identifier, e.g. a phone number or short code
    pub sender: String,

    /// Message body
    pub body: String,

    /// When the message arrived
    pub received_at: DateTime<Utc>,
}

impl InboundMessage {
    /// Create a message stamped with the current instant
    pub fn new(id: impl Into<String>, sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            sender: sender.into(),
            body: body.into(),
            received_at: Utc::now(),
        }
    }
}

/// One keyword × sender-pattern rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Lowercase keywords matched as substrings of the message body
    pub keywords: Vec<String>,

    /// Sender patterns; `"*"` matches any sender, otherwise exact match
    pub sender_patterns: Vec<String>,

    /// Whether a match should auto-start the response pipeline
    pub auto_respond: bool,
}

impl TriggerRule {
    /// Create a rule, rejecting an empty keyword set at the boundary
    pub fn new(
        keywords: Vec<String>,
        sender_patterns: Vec<String>,
        auto_respond: bool,
    ) -> Result<Self> {
        if keywords.is_empty() {
            return Err(LifelineError::EmptyKeywords);
        }
        Ok(Self {
            keywords: keywords.into_iter().map(|k| k.to_lowercase()).collect(),
            sender_patterns,
            auto_respond,
        })
    }

    /// Whether this rule matches the given sender and body
    pub fn matches(&self, sender: &str, body: &str) -> bool {
        let lower_body = body.to_lowercase();
        let keyword_hit = self.keywords.iter().any(|k| lower_body.contains(k));
        let sender_hit = self
            .sender_patterns
            .iter()
            .any(|p| p == WILDCARD_SENDER || p == sender);
        keyword_hit && sender_hit
    }
}

/// Mutable, insertion-ordered collection of trigger rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerMatcher {
    rules: Vec<TriggerRule>,
}

impl TriggerMatcher {
    /// Create a matcher with no rules (matches nothing)
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Create a matcher seeded with the default emergency rule
    pub fn with_default_rules() -> Self {
        Self {
            rules: vec![TriggerRule {
                keywords: ["emergency", "accident", "help", "sos", "danger", "crash"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                sender_patterns: [WILDCARD_SENDER, "911", "112"]
                    .into_iter()
                    .map(String::from)
                    .collect(),
                auto_respond: true,
            }],
        }
    }

    /// True iff at least one rule matches the sender and body
    pub fn evaluate(&self, sender: &str, body: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(sender, body))
    }

    /// Append a rule
    pub fn add_rule(&mut self, rule: TriggerRule) {
        self.rules.push(rule);
    }

    /// Remove the rule at `index`
    pub fn remove_rule(&mut self, index: usize) -> Result<TriggerRule> {
        if index >= self.rules.len() {
            return Err(LifelineError::RuleNotFound(index));
        }
        Ok(self.rules.remove(index))
    }

    /// The rules in insertion order
    pub fn rules(&self) -> &[TriggerRule] {
        &self.rules
    }

    /// Load rules from the store, seeding the defaults on first run
    pub async fn load(store: &dyn PersistentStore) -> Result<Self> {
        match store.get(TRIGGER_RULES_KEY).await? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => {
                let matcher = Self::with_default_rules();
                matcher.save(store).await?;
                Ok(matcher)
            }
        }
    }

    /// Persist the rule set
    pub async fn save(&self, store: &dyn PersistentStore) -> Result<()> {
        store
            .set(TRIGGER_RULES_KEY, serde_json::to_vec(self)?)
            .await
    }
}

impl Default for TriggerMatcher {
    fn default() -> Self {
        Self::new()
    }
}
