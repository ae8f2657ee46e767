use serde::{Deserialize, Serialize};

/// Ledger subsystem configuration: adaptive checkpoint batching.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// Checkpoint batch size used once the write rate exceeds
    /// `high_write_rate_per_sec` over the sliding window.
    pub checkpoint_min: u64,
    /// Checkpoint batch size used while the write rate is calm.
    pub checkpoint_max: u64,
    /// Writes/second threshold above which the batch shrinks to `checkpoint_min`.
    pub high_write_rate_per_sec: f64,
    /// Width, in seconds, of the sliding window used to estimate write rate.
    pub rate_window_secs: u64,
    /// Cap on timestamps retained in the rate-estimation window.
    pub rate_window_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            checkpoint_min: 100,
            checkpoint_max: 1000,
            high_write_rate_per_sec: 10.0,
            rate_window_secs: 60,
            rate_window_capacity: 5000,
        }
    }
}
