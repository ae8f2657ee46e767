use chrono::{DateTime, Utc};

/// Temporal predicate modes the storage layer's query builder accepts.
#[derive(Debug, Clone)]
pub enum TemporalPredicate {
    /// `valid_until IS NULL`.
    ActiveOnly,
    /// `valid_from <= ts AND (valid_until IS NULL OR valid_until > ts)`.
    AsOf(DateTime<Utc>),
    /// Rows created at or before `target_tx_id`, valid at that transaction's
    /// timestamp.
    TimeTravel { target_tx_id: i64 },
    /// No temporal restriction — every revision, active and deprecated.
    AllRevisions,
}

/// Parameters for `search`.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub query: String,
    pub query_embedding: Option<Vec<f32>>,
    pub top_k: usize,
    pub project: Option<String>,
    pub as_of: Option<DateTime<Utc>>,
    pub graph_depth: u32,
}
