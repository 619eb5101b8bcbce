//! Bounded SQLite connection pool
//!
//! A fixed set of connections handed out under a semaphore. When every
//! connection is busy, callers wait for a permit instead of failing.
//! Queries run on tokio's blocking pool because SQLite calls block.

use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::error::{StorageError, StorageResult};

/// Pool of SQLite connections to a single database file
pub struct ConnectionPool {
    idle: Arc<Mutex<Vec<Connection>>>,
    permits: Arc<Semaphore>,
    size: usize,
    path: PathBuf,
}

impl ConnectionPool {
    /// Open `size` connections to the database at `path`
    pub fn open(path: &Path, size: usize, busy_timeout: Duration) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let size = size.max(1);
        let connections = (0..size)
            .map(|_| open_connection(path, busy_timeout))
            .collect::<StorageResult<Vec<_>>>()?;

        tracing::debug!(path = ?path, size, "Opened SQLite connection pool");

        Ok(Self {
            idle: Arc::new(Mutex::new(connections)),
            permits: Arc::new(Semaphore::new(size)),
            size,
            path: path.to_path_buf(),
        })
    }

    /// Run `f` against a pooled connection on the blocking thread pool
    ///
    /// The connection goes back to the pool when `f` returns, panics, or the
    /// calling future is dropped mid-query.
    pub async fn run<F, T>(&self, f: F) -> StorageResult<T>
    where
        F: FnOnce(&mut Connection) -> StorageResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StorageError::PoolClosed)?;

        let mut checkout = self.checkout(permit)?;
        tokio::task::spawn_blocking(move || f(checkout.conn())).await?
    }

    /// Stop handing out connections; pending and future callers get `PoolClosed`
    pub fn close(&self) {
        self.permits.close();
    }

    /// Configured number of connections
    pub fn size(&self) -> usize {
        self.size
    }

    /// Connections not currently checked out
    pub fn idle_count(&self) -> usize {
        lock_idle(&self.idle).len()
    }

    /// Database file this pool is connected to
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn checkout(&self, permit: OwnedSemaphorePermit) -> StorageResult<Checkout> {
        let conn = lock_idle(&self.idle)
            .pop()
            .ok_or_else(|| StorageError::Task("no idle connection despite permit".to_string()))?;

        Ok(Checkout {
            conn: Some(conn),
            idle: Arc::clone(&self.idle),
            _permit: permit,
        })
    }
}

/// A connection on loan from the pool
///
/// Dropping it returns the connection before the permit is released, so a
/// permit holder always finds an idle connection.
struct Checkout {
    conn: Option<Connection>,
    idle: Arc<Mutex<Vec<Connection>>>,
    _permit: OwnedSemaphorePermit,
}

impl Checkout {
    fn conn(&mut self) -> &mut Connection {
        self.conn
            .as_mut()
            .expect("connection is present until the checkout is dropped")
    }
}

impl Drop for Checkout {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            lock_idle(&self.idle).push(conn);
        }
    }
}

fn lock_idle(idle: &Mutex<Vec<Connection>>) -> std::sync::MutexGuard<'_, Vec<Connection>> {
    // A panic while holding the lock cannot leave the Vec half-modified
    idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn open_connection(path: &Path, busy_timeout: Duration) -> StorageResult<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;

    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        ",
    )?;

    Ok(conn)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn test_pool(size: usize) -> (ConnectionPool, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let pool =
            ConnectionPool::open(&dir.path().join("pool.db"), size, Duration::from_secs(1))
                .unwrap();
        (pool, dir)
    }

    #[tokio::test]
    async fn test_run_returns_connection() {
        let (pool, _dir) = test_pool(2);
        assert_eq!(pool.size(), 2);

        let one: i64 = pool
            .run(|conn| Ok(conn.query_row("SELECT 1", [], |row| row.get(0))?))
            .await
            .unwrap();
        assert_eq!(one, 1);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn test_zero_size_is_clamped() {
        let (pool, _dir) = test_pool(0);
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_error_still_returns_connection() {
        let (pool, _dir) = test_pool(1);

        let result: StorageResult<()> = pool
            .run(|conn| {
                conn.execute("INSERT INTO missing_table VALUES (1)", [])?;
                Ok(())
            })
            .await;
        assert!(matches!(result, Err(StorageError::Sqlite(_))));
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_panic_still_returns_connection() {
        let (pool, _dir) = test_pool(1);

        let result: StorageResult<()> = pool.run(|_| panic!("boom")).await;
        assert!(matches!(result, Err(StorageError::Task(_))));
        assert_eq!(pool.idle_count(), 1);

        // Pool is still usable afterwards
        let ok = pool.run(|_| Ok(())).await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_callers_queue_when_exhausted() {
        let (pool, _dir) = test_pool(1);
        let pool = Arc::new(pool);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move {
                    pool.run(move |_| {
                        std::thread::sleep(Duration::from_millis(5));
                        Ok(i)
                    })
                    .await
                })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_ok());
        }
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects() {
        let (pool, _dir) = test_pool(1);
        pool.close();

        let result = pool.run(|_| Ok(())).await;
        assert!(matches!(result, Err(StorageError::PoolClosed)));
    }
}
