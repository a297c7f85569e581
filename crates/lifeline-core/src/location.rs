//! Location provider boundary
//!
//! The core never talks to GPS hardware or a browser geolocation API; the
//! host injects a [`LocationProvider`]. Absence of a fix is never fatal:
//! the coordinator bounds the request with a timeout and proceeds degraded.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::events::GeoPoint;
use crate::Result;

/// A position fix obtained from a provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionFix {
    /// Latitude in signed degrees
    pub latitude: f64,
    /// Longitude in signed degrees
    pub longitude: f64,
    /// Horizontal accuracy in meters
    pub accuracy_m: Option<f64>,
    /// When the fix was obtained
    pub obtained_at: DateTime<Utc>,
}

impl From<PositionFix> for GeoPoint {
    fn from(fix: PositionFix) -> Self {
        GeoPoint {
            latitude: fix.latitude,
            longitude: fix.longitude,
            accuracy_m: fix.accuracy_m,
        }
    }
}

/// Source of position fixes, implemented by the host
#[async_trait]
pub trait LocationProvider: Send + Sync {
    /// Obtain a single position fix. The caller bounds this with a timeout.
    async fn current_position(&self, high_accuracy: bool) -> Result<PositionFix>;

    /// Start a continuous stream of fixes at the given interval.
    ///
    /// Dropping or cancelling the returned watch stops the stream.
    async fn watch_position(&self, interval: Duration) -> Result<PositionWatch>;
}

/// Handle to a continuous position stream
#[derive(Debug)]
pub struct PositionWatch {
    /// Receiver of streamed fixes
    pub rx: mpsc::Receiver<PositionFix>,
    task: JoinHandle<()>,
}

impl PositionWatch {
    /// Create a watch from a receiver and the task feeding it
    pub fn new(rx: mpsc::Receiver<PositionFix>, task: JoinHandle<()>) -> Self {
        Self { rx, task }
    }

    /// Stop the underlying stream
    pub fn cancel(&self) {
        self.task.abort();
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Provider that always reports one fixed position (tests and simulations)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocationProvider {
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
}

impl FixedLocationProvider {
    /// Create a provider pinned at the given point
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self {
            latitude,
            longitude,
            accuracy_m,
        }
    }

    fn fix(&self) -> PositionFix {
        PositionFix {
            latitude: self.latitude,
            longitude: self.longitude,
            accuracy_m: Some(self.accuracy_m),
            obtained_at: Utc::now(),
        }
    }
}

#[async_trait]
impl LocationProvider for FixedLocationProvider {
    async fn current_position(&self, _high_accuracy: bool) -> Result<PositionFix> {
        Ok(self.fix())
    }

    async fn watch_position(&self, interval: Duration) -> Result<PositionWatch> {
        let (tx, rx) = mpsc::channel(16);
        let provider = *self;
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if tx.send(provider.fix()).await.is_err() {
                    break;
                }
            }
        });
        Ok(PositionWatch::new(rx, task))
    }
}
