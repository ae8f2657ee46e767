use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single trust signal on a fact. Aggregates into
/// `Fact::consensus_score`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vote {
    pub id: i64,
    pub fact_id: i64,
    pub agent_id: String,
    /// -1, 0, or +1.
    pub value: i8,
    pub weight: f64,
    pub reputation_at_vote: f64,
    pub created_at: DateTime<Utc>,
}

/// Minimal agent record referenced by `Vote::agent_id`.
/// Reputation is caller-supplied at vote time; the engine does not compute
/// it independently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub agent_id: String,
    pub reputation: f64,
    pub created_at: DateTime<Utc>,
}
