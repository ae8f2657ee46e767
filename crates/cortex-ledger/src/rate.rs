//! Sliding-window write-rate estimator driving adaptive checkpoint batch
//! sizing.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use cortex_core::config::LedgerConfig;

pub struct WriteRateTracker {
    timestamps: Mutex<VecDeque<Instant>>,
    capacity: usize,
}

impl WriteRateTracker {
    pub fn new(capacity: usize) -> Self {
        Self {
            timestamps: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
        }
    }

    pub fn record(&self) {
        let mut ts = self.timestamps.lock().expect("write-rate lock poisoned");
        ts.push_back(Instant::now());
        while ts.len() > self.capacity {
            ts.pop_front();
        }
    }

    /// Writes/sec observed over the trailing `window_secs`.
    pub fn rate(&self, window_secs: u64) -> f64 {
        let cutoff = Instant::now() - Duration::from_secs(window_secs);
        let ts = self.timestamps.lock().expect("write-rate lock poisoned");
        let recent = ts.iter().filter(|t| **t > cutoff).count();
        recent as f64 / window_secs as f64
    }

    pub fn adaptive_batch_size(&self, config: &LedgerConfig) -> u64 {
        if self.rate(config.rate_window_secs) > config.high_write_rate_per_sec {
            config.checkpoint_min
        } else {
            config.checkpoint_max
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tracker_has_zero_rate() {
        let t = WriteRateTracker::new(100);
        assert_eq!(t.rate(60), 0.0);
    }

    #[test]
    fn calm_tracker_picks_checkpoint_max() {
        let t = WriteRateTracker::new(100);
        let config = LedgerConfig::default();
        assert_eq!(t.adaptive_batch_size(&config), config.checkpoint_max);
    }

    #[test]
    fn burst_picks_checkpoint_min() {
        let t = WriteRateTracker::new(5000);
        let config = LedgerConfig::default();
        for _ in 0..700 {
            t.record();
        }
        assert_eq!(t.adaptive_batch_size(&config), config.checkpoint_min);
    }

    #[test]
    fn capacity_bounds_memory() {
        let t = WriteRateTracker::new(10);
        for _ in 0..50 {
            t.record();
        }
        assert_eq!(t.timestamps.lock().unwrap().len(), 10);
    }
}
