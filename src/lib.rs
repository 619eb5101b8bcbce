//! # Weather Station
//!
//! Backend for a remote weather sensor: ingests periodic temperature and
//! humidity readings, stores them, and pushes each new reading to every
//! connected dashboard in real time.
//!
//! ## Modules
//!
//! - [`storage`]: SQLite-backed measurement store with a bounded connection pool
//! - [`websocket`]: Broadcast hub and live connection handling
//! - [`api`]: REST API server with Axum
//! - [`config`]: TOML + environment configuration
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use weather_station::{AppState, Config, SqliteStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env();
//!     let store = Arc::new(SqliteStore::open(&config.database).await?);
//!
//!     let state = AppState::with_hub_config(
//!         store,
//!         config.server.clone(),
//!         config.websocket.hub_config(),
//!     );
//!     weather_station::serve(state, &config.server).await?;
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod storage;
pub mod websocket;

pub use storage::{
    ConnectionPool, Measurement, MeasurementStore, NewMeasurement, SqliteStore, StorageError,
    StorageResult,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{
    websocket_handler, BroadcastHub, BroadcastReport, DeliveryError, HubConfig, ObserverId,
    ReadingUpdate,
};

pub use config::{
    Config, ConfigError, DatabaseConfig, LoggingConfig, ServerConfig, WebSocketConfig,
};
