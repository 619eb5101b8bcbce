//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::config::ServerConfig;
use crate::storage::MeasurementStore;
use crate::websocket::{BroadcastHub, HubConfig};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Measurement store for reading/writing readings
    pub store: Arc<dyn MeasurementStore>,
    /// Observer registry for real-time pushes
    pub hub: Arc<BroadcastHub>,
    /// Server configuration
    pub config: Arc<ServerConfig>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState with a default hub
    pub fn new(store: Arc<dyn MeasurementStore>, config: ServerConfig) -> Self {
        Self::with_hub_config(store, config, HubConfig::default())
    }

    /// Create AppState with custom hub configuration
    pub fn with_hub_config(
        store: Arc<dyn MeasurementStore>,
        config: ServerConfig,
        hub_config: HubConfig,
    ) -> Self {
        Self {
            store,
            hub: Arc::new(BroadcastHub::new(hub_config)),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
