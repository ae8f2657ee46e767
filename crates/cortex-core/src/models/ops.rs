use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot metadata sidecar: one per `<name>.db`/`<name>.json` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotInfo {
    pub name: String,
    pub tx_id: i64,
    pub merkle_root: Option<String>,
    pub created_at: DateTime<Utc>,
    pub size_mb: f64,
    pub path: String,
}

/// Compaction strategies, any combination applied in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompactionStrategy {
    Dedup,
    MergeErrors,
    StalenessPrune,
}

/// Outcome of one compaction run, logged verbatim to `compaction_log`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompactionResult {
    pub strategies: Vec<CompactionStrategy>,
    pub deprecated_ids: Vec<i64>,
    pub new_fact_ids: Vec<i64>,
    pub before_count: i64,
    pub after_count: i64,
    pub dry_run: bool,
}

/// Aggregate engine statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stats {
    pub fact_count: i64,
    pub active_fact_count: i64,
    pub transaction_count: i64,
    pub checkpoint_count: i64,
    pub entity_count: i64,
    pub relation_count: i64,
    pub pending_outbox_count: i64,
    pub database_size_bytes: i64,
}
