//! Connection pool: one writer + N round-robin readers.
//!
//! A single `std::sync::Mutex<Connection>` per slot lets the same pool
//! serve both the async engine (via `spawn_blocking`) and the synchronous
//! `BlockingCortex` facade without duplicating connections.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;

use cortex_core::config::StorageConfig;
use cortex_core::errors::{CortexResult, StorageError};

use crate::migrations;
use crate::pragmas::{configure_connection, configure_readonly_connection};

/// Writer + reader pool for one Cortex database file.
pub struct Pool {
    writer: Arc<Mutex<Connection>>,
    readers: Vec<Arc<Mutex<Connection>>>,
    read_index: AtomicUsize,
    path: PathBuf,
    acquire_timeout: Duration,
}

impl Pool {
    /// Open a file-backed pool, running pending migrations on the writer
    /// connection before readers attach.
    pub fn open(path: &Path, config: &StorageConfig) -> CortexResult<Self> {
        let writer = Connection::open(path).map_err(|e| StorageError::Sqlite(e.to_string()))?;
        configure_connection(&writer, config.busy_timeout_ms, config.mmap_size_bytes)?;
        migrations::run_migrations(&writer)?;

        let mut readers = Vec::with_capacity(config.reader_pool_size.max(1));
        for _ in 0..config.reader_pool_size.max(1) {
            let reader = Connection::open_with_flags(
                path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .map_err(|e| StorageError::Sqlite(e.to_string()))?;
            configure_readonly_connection(&reader, config.busy_timeout_ms, config.mmap_size_bytes)?;
            readers.push(Arc::new(Mutex::new(reader)));
        }

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            readers,
            read_index: AtomicUsize::new(0),
            path: path.to_path_buf(),
            acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms.max(1)),
        })
    }

    /// Open an in-memory pool for tests. Readers fall back to the writer
    /// connection since separate `:memory:` connections do not share state.
    pub fn open_in_memory(config: &StorageConfig) -> CortexResult<Self> {
        let writer = Connection::open_in_memory().map_err(|e| StorageError::Sqlite(e.to_string()))?;
        configure_connection(&writer, config.busy_timeout_ms, config.mmap_size_bytes)?;
        migrations::run_migrations(&writer)?;

        Ok(Self {
            writer: Arc::new(Mutex::new(writer)),
            readers: Vec::new(),
            read_index: AtomicUsize::new(0),
            path: PathBuf::from(":memory:"),
            acquire_timeout: Duration::from_millis(config.pool_acquire_timeout_ms.max(1)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run `f` against the writer connection on the current thread.
    pub fn with_writer_blocking<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&Connection) -> CortexResult<T>,
    {
        let conn = self
            .writer
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` against a round-robin reader connection on the current
    /// thread, falling back to the writer when no readers exist.
    pub fn with_reader_blocking<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&Connection) -> CortexResult<T>,
    {
        if self.readers.is_empty() {
            return self.with_writer_blocking(f);
        }
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let conn = self.readers[index]
            .lock()
            .map_err(|e| StorageError::Poisoned(e.to_string()))?;
        f(&conn)
    }

    /// Run `f` against the writer connection on a blocking thread pool
    /// thread. Bounded by `pool_acquire_timeout_ms`: if the connection is
    /// not acquired and `f` has not returned within that window, surfaces
    /// `StorageError::PoolExhausted` (`ErrorKind::ResourceExhausted`)
    /// rather than blocking the caller indefinitely.
    pub async fn with_writer<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&Connection) -> CortexResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let writer = self.writer.clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = writer.lock().map_err(|e| StorageError::Poisoned(e.to_string()))?;
            f(&conn)
        });
        match tokio::time::timeout(self.acquire_timeout, task).await {
            Ok(joined) => joined.map_err(|e| StorageError::Sqlite(format!("writer task panicked: {e}")))?,
            Err(_) => Err(StorageError::PoolExhausted.into()),
        }
    }

    /// Run `f` against a round-robin reader on a blocking thread pool
    /// thread, falling back to the writer when no readers exist. Bounded
    /// by `pool_acquire_timeout_ms`, same as [`Pool::with_writer`].
    pub async fn with_reader<F, T>(&self, f: F) -> CortexResult<T>
    where
        F: FnOnce(&Connection) -> CortexResult<T> + Send + 'static,
        T: Send + 'static,
    {
        if self.readers.is_empty() {
            return self.with_writer(f).await;
        }
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.readers.len();
        let reader = self.readers[index].clone();
        let task = tokio::task::spawn_blocking(move || {
            let conn = reader.lock().map_err(|e| StorageError::Poisoned(e.to_string()))?;
            f(&conn)
        });
        match tokio::time::timeout(self.acquire_timeout, task).await {
            Ok(joined) => joined.map_err(|e| StorageError::Sqlite(format!("reader task panicked: {e}")))?,
            Err(_) => Err(StorageError::PoolExhausted.into()),
        }
    }

    pub fn is_wal_mode(&self) -> bool {
        self.with_writer_blocking(|conn| {
            let mode: String = conn
                .query_row("PRAGMA journal_mode", [], |row| row.get(0))
                .unwrap_or_default();
            Ok(mode.to_lowercase() == "wal")
        })
        .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opens_in_memory_and_runs_migrations() {
        let pool = Pool::open_in_memory(&StorageConfig::default()).unwrap();
        let version = pool
            .with_writer_blocking(|conn| crate::migrations::current_version(conn))
            .unwrap();
        assert_eq!(version, migrations::LATEST_VERSION);
    }

    #[tokio::test]
    async fn writer_and_reader_share_in_memory_state() {
        let pool = Pool::open_in_memory(&StorageConfig::default()).unwrap();
        pool.with_writer(|conn| {
            conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
            conn.execute("INSERT INTO t VALUES (1)", []).unwrap();
            Ok(())
        })
        .await
        .unwrap();

        let count: i64 = pool
            .with_reader(|conn| {
                conn.query_row("SELECT COUNT(*) FROM t", [], |row| row.get(0))
                    .map_err(|e| StorageError::Sqlite(e.to_string()).into())
            })
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn writer_acquisition_times_out_under_contention() {
        let mut config = StorageConfig::default();
        config.pool_acquire_timeout_ms = 50;
        let pool = Pool::open_in_memory(&config).unwrap();

        // Hold the writer lock on a dedicated OS thread for longer than the
        // configured acquire timeout, simulating a stuck writer.
        let held = pool.writer.clone();
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            let _guard = held.lock().unwrap();
            tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(300));
        });
        rx.recv().unwrap();

        let err = pool.with_writer(|_conn| Ok(())).await.unwrap_err();
        assert!(matches!(err.kind(), cortex_core::errors::ErrorKind::ResourceExhausted));

        handle.join().unwrap();
    }
}
