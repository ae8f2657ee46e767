use serde::{Deserialize, Serialize};

/// Storage subsystem configuration: database location and pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    pub database_path: String,
    /// Number of read-only pooled connections (round-robin).
    pub reader_pool_size: usize,
    /// Milliseconds `PRAGMA busy_timeout` blocks before returning SQLITE_BUSY.
    pub busy_timeout_ms: u32,
    /// `PRAGMA mmap_size` in bytes, 0 disables memory-mapped I/O.
    pub mmap_size_bytes: u64,
    /// Milliseconds to wait for a pooled connection before surfacing
    /// `ResourceExhausted` to the caller.
    pub pool_acquire_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: "cortex.db".to_string(),
            reader_pool_size: 4,
            busy_timeout_ms: 5000,
            mmap_size_bytes: 256 * 1024 * 1024,
            pool_acquire_timeout_ms: 5000,
        }
    }
}
