//! Storage error types
//!
//! Every failure of the measurement store surfaces as a `StorageError`.
//! Callers decide whether to retry; the store never does.

use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// SQLite rejected the statement or the database is unavailable
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed (creating the data directory)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The blocking worker running the query panicked or was cancelled
    #[error("Storage task failed: {0}")]
    Task(String),

    /// The connection pool was shut down
    #[error("Connection pool closed")]
    PoolClosed,

    /// A stored row could not be decoded
    #[error("Corrupt data: {0}")]
    Corrupt(String),
}

impl From<tokio::task::JoinError> for StorageError {
    fn from(err: tokio::task::JoinError) -> Self {
        StorageError::Task(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = StorageError::PoolClosed;
        assert_eq!(err.to_string(), "Connection pool closed");

        let err = StorageError::Corrupt("timestamp out of range".to_string());
        assert_eq!(err.to_string(), "Corrupt data: timestamp out of range");
    }

    #[test]
    fn test_sqlite_error_conversion() {
        let sqlite_err = rusqlite::Error::QueryReturnedNoRows;
        let storage_err: StorageError = sqlite_err.into();
        assert!(matches!(storage_err, StorageError::Sqlite(_)));
    }
}
