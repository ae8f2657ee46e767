use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hash construction version recorded for audit observability only —
/// `verify_hash` always tries both regardless of this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashVersion {
    V1,
    V2,
}

/// A single append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub project: String,
    pub action: String,
    /// Canonical JSON serialization of the action's detail object.
    pub detail: String,
    pub timestamp: DateTime<Utc>,
    pub prev_hash: String,
    pub hash: String,
    pub hash_version: HashVersion,
}

/// Seals a contiguous transaction range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MerkleCheckpoint {
    pub id: i64,
    pub root_hash: String,
    pub tx_start_id: i64,
    pub tx_end_id: i64,
    pub tx_count: i64,
    pub created_at: DateTime<Utc>,
}

/// A single violation recorded by `verify_integrity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    HashMismatch { tx_id: i64 },
    ChainBreak { tx_id: i64 },
    MerkleMismatch { checkpoint_id: i64 },
}

/// Result of a full ledger walk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrityReport {
    pub valid: bool,
    pub violations: Vec<IntegrityViolation>,
    pub tx_checked: i64,
    pub roots_checked: i64,
}
