//! WebSocket Message Types
//!
//! The push channel is one-way: the server sends a `ReadingUpdate` after
//! every stored reading and expects nothing back.

use serde::Serialize;

use crate::storage::Measurement;

/// Live reading pushed to every connected viewer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ReadingUpdate {
    pub temperature: f64,
    pub humidity: f64,
}

impl ReadingUpdate {
    pub fn new(temperature: f64, humidity: f64) -> Self {
        Self {
            temperature,
            humidity,
        }
    }

    /// JSON text frame payload
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl From<&Measurement> for ReadingUpdate {
    fn from(m: &Measurement) -> Self {
        Self::new(m.temperature, m.humidity)
    }
}
