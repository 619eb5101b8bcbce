//! SQLite-backed measurement store
//!
//! Readings live in a single `measurements` table. Timestamps are stored as
//! Unix milliseconds so range scans use the integer index directly.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

use super::error::{StorageError, StorageResult};
use super::pool::ConnectionPool;
use super::store::MeasurementStore;
use super::types::{from_millis, Measurement, NewMeasurement};
use crate::config::DatabaseConfig;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS measurements (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        temperature REAL NOT NULL,
        humidity REAL NOT NULL,
        timestamp INTEGER NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_measurements_timestamp ON measurements(timestamp);
";

/// Measurement store on top of a pooled SQLite database
pub struct SqliteStore {
    pool: ConnectionPool,
}

impl SqliteStore {
    /// Open the database described by `config`, creating the schema if needed
    pub async fn open(config: &DatabaseConfig) -> StorageResult<Self> {
        Self::open_path(&config.db_path(), config.pool_size, config.busy_timeout()).await
    }

    /// Open a database file directly
    pub async fn open_path(
        path: &Path,
        pool_size: usize,
        busy_timeout: std::time::Duration,
    ) -> StorageResult<Self> {
        let pool = ConnectionPool::open(path, pool_size, busy_timeout)?;
        pool.run(|conn| Ok(conn.execute_batch(SCHEMA)?)).await?;

        tracing::info!(path = ?path, pool_size = pool.size(), "Measurement store ready");
        Ok(Self { pool })
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &ConnectionPool {
        &self.pool
    }

    /// Close the pool; in-flight queries finish, new ones fail
    pub fn shutdown(&self) {
        self.pool.close();
    }
}

#[async_trait]
impl MeasurementStore for SqliteStore {
    async fn insert(&self, measurement: NewMeasurement) -> StorageResult<Measurement> {
        let stored = self
            .pool
            .run(move |conn| insert_row(conn, measurement))
            .await?;

        tracing::debug!(
            id = stored.id,
            temperature = stored.temperature,
            humidity = stored.humidity,
            "Stored measurement"
        );
        Ok(stored)
    }

    async fn latest(&self) -> StorageResult<Option<Measurement>> {
        self.pool
            .run(|conn| {
                let raw = conn
                    .query_row(
                        "SELECT id, temperature, humidity, timestamp FROM measurements
                         ORDER BY timestamp DESC, id DESC LIMIT 1",
                        [],
                        raw_row,
                    )
                    .optional()?;
                raw.map(RawRow::into_measurement).transpose()
            })
            .await
    }

    async fn history(&self, window: Duration) -> StorageResult<Vec<Measurement>> {
        if window <= Duration::zero() {
            return Ok(Vec::new());
        }

        self.pool
            .run(move |conn| {
                let now = Utc::now();
                let start = now
                    .checked_sub_signed(window)
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                select_range(conn, start, now)
            })
            .await
    }

    async fn ping(&self) -> StorageResult<()> {
        self.pool
            .run(|conn| {
                conn.query_row("SELECT 1", [], |_| Ok(()))?;
                Ok(())
            })
            .await
    }
}

fn insert_row(conn: &mut Connection, measurement: NewMeasurement) -> StorageResult<Measurement> {
    let timestamp = measurement.timestamp.unwrap_or_else(Utc::now);
    let ms = timestamp.timestamp_millis();

    conn.execute(
        "INSERT INTO measurements (temperature, humidity, timestamp) VALUES (?1, ?2, ?3)",
        params![measurement.temperature, measurement.humidity, ms],
    )?;

    RawRow {
        id: conn.last_insert_rowid(),
        temperature: measurement.temperature,
        humidity: measurement.humidity,
        timestamp_ms: ms,
    }
    .into_measurement()
}

fn select_range(
    conn: &Connection,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> StorageResult<Vec<Measurement>> {
    let mut stmt = conn.prepare_cached(
        "SELECT id, temperature, humidity, timestamp FROM measurements
         WHERE timestamp >= ?1 AND timestamp <= ?2
         ORDER BY timestamp ASC, id ASC",
    )?;

    let rows = stmt
        .query_map(
            params![start.timestamp_millis(), end.timestamp_millis()],
            raw_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    rows.into_iter().map(RawRow::into_measurement).collect()
}

/// Row as it sits in SQLite, before timestamp decoding
struct RawRow {
    id: i64,
    temperature: f64,
    humidity: f64,
    timestamp_ms: i64,
}

impl RawRow {
    fn into_measurement(self) -> StorageResult<Measurement> {
        let timestamp = from_millis(self.timestamp_ms).ok_or_else(|| {
            StorageError::Corrupt(format!(
                "row {} has out-of-range timestamp {}",
                self.id, self.timestamp_ms
            ))
        })?;

        Ok(Measurement {
            id: self.id,
            temperature: self.temperature,
            humidity: self.humidity,
            timestamp,
        })
    }
}

fn raw_row(row: &Row<'_>) -> rusqlite::Result<RawRow> {
    Ok(RawRow {
        id: row.get(0)?,
        temperature: row.get(1)?,
        humidity: row.get(2)?,
        timestamp_ms: row.get(3)?,
    })
}
