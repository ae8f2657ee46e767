use serde::{Deserialize, Serialize};

/// Compaction subsystem configuration: dedup and staleness-prune defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompactionConfig {
    /// Minimum normalized-Levenshtein ratio for phase-2 near-duplicate merging.
    pub similarity_threshold: f64,
    /// Facts older than this, in days, are eligible for staleness pruning.
    pub max_age_days: i64,
    /// Facts with `consensus_score` below this are eligible for staleness pruning.
    pub min_consensus: f64,
}

impl Default for CompactionConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: 0.85,
            max_age_days: 90,
            min_consensus: 0.5,
        }
    }
}
