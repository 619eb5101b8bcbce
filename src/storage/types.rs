//! Core data types for the measurement store
//!
//! - `Measurement`: a persisted sensor reading
//! - `NewMeasurement`: a validated reading waiting to be written

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// A single persisted sensor reading
///
/// Immutable once written. `id` is assigned by the store and strictly
/// increases with insertion order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    /// Store-assigned row id
    pub id: i64,
    /// Temperature as reported by the device (unit is pass-through)
    pub temperature: f64,
    /// Relative humidity as reported by the device
    pub humidity: f64,
    /// Time the reading was recorded
    pub timestamp: DateTime<Utc>,
}

/// A reading that passed validation and can be inserted
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NewMeasurement {
    pub temperature: f64,
    pub humidity: f64,
    /// Explicit timestamp; the store uses the current time when `None`
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewMeasurement {
    /// Create a reading stamped by the store at insert time
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
            timestamp: None,
        }
    }

    /// Builder method: pin the timestamp instead of using "now"
    pub fn at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = Some(timestamp);
        self
    }
}

/// Convert a stored millisecond timestamp back into a `DateTime`
pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}
