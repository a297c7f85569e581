//! Core configuration

use serde::{Deserialize, Serialize};

use crate::bus::DEFAULT_BUS_CAPACITY;
use crate::events::DEFAULT_EVENT_CAP;
use crate::geo::DEFAULT_PRIORITY_WEIGHT;

/// Configuration for the alert coordinator and its components
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// How long to wait for a position fix before proceeding without one
    pub location_timeout_ms: u64,

    /// Request a high-accuracy fix from the location provider
    pub high_accuracy: bool,

    /// Maximum events retained in the audit log
    pub event_log_cap: usize,

    /// How many services to rank per category on dispatch
    pub nearest_k: usize,

    /// Ordering weight for the prioritized category in weighted ranking
    pub priority_weight: f64,

    /// Buffered events per bus subscriber
    pub bus_capacity: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            location_timeout_ms: 10_000,
            high_accuracy: true,
            event_log_cap: DEFAULT_EVENT_CAP,
            nearest_k: 3,
            priority_weight: DEFAULT_PRIORITY_WEIGHT,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }
}

impl CoreConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the location timeout in milliseconds
    pub fn with_location_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.location_timeout_ms = timeout_ms;
        self
    }

    /// Set the event log capacity
    pub fn with_event_log_cap(mut self, cap: usize) -> Self {
        self.event_log_cap = cap;
        self
    }

    /// Set how many services to rank per category
    pub fn with_nearest_k(mut self, k: usize) -> Self {
        self.nearest_k = k;
        self
    }

    /// Set the ordering weight for the prioritized category
    pub fn with_priority_weight(mut self, weight: f64) -> Self {
        self.priority_weight = weight;
        self
    }

    /// Load configuration from a JSON file
    pub fn from_file(path: &str) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file(&self, path: &str) -> crate::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
