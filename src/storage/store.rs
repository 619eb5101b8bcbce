//! Measurement store abstraction
//!
//! Handlers talk to storage through this trait so the backing database can
//! be swapped (or faked in tests) without touching the HTTP layer.

use async_trait::async_trait;
use chrono::Duration;

use super::error::StorageResult;
use super::types::{Measurement, NewMeasurement};

/// Append-only store of sensor readings
///
/// Implementations must be safe to call from many in-flight requests at once.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    /// Durably write a reading and return it with its assigned id and timestamp
    ///
    /// Atomic from the caller's point of view: on error nothing was written.
    async fn insert(&self, measurement: NewMeasurement) -> StorageResult<Measurement>;

    /// Most recent reading by timestamp, or `None` when the store is empty
    async fn latest(&self) -> StorageResult<Option<Measurement>>;

    /// Readings with `now - window <= timestamp <= now`, oldest first
    async fn history(&self, window: Duration) -> StorageResult<Vec<Measurement>>;

    /// Cheap round trip to the database, used by readiness checks
    async fn ping(&self) -> StorageResult<()>;
}
