//! Measurement Storage
//!
//! Durable, append-only storage for sensor readings:
//!
//! - **types**: `Measurement` and `NewMeasurement`
//! - **store**: the `MeasurementStore` trait handlers depend on
//! - **sqlite**: SQLite implementation of the store
//! - **pool**: bounded connection pool shared by concurrent requests
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use weather_station::storage::{MeasurementStore, NewMeasurement, SqliteStore};
//! use weather_station::config::DatabaseConfig;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = SqliteStore::open(&DatabaseConfig::default()).await?;
//!
//!     let stored = store.insert(NewMeasurement::new(21.5, 60.0)).await?;
//!     println!("stored reading #{}", stored.id);
//!
//!     let day = store.history(chrono::Duration::hours(24)).await?;
//!     println!("{} readings in the last day", day.len());
//!
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod pool;
pub mod sqlite;
pub mod store;
pub mod types;

pub use error::{StorageError, StorageResult};
pub use pool::ConnectionPool;
pub use sqlite::SqliteStore;
pub use store::MeasurementStore;
pub use types::{Measurement, NewMeasurement};
