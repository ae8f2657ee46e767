use serde::{Deserialize, Serialize};

use super::fact::Fact;
use super::graph::Subgraph;

/// One ranked hit from vector KNN or FTS, prior to RRF fusion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedHit {
    pub fact_id: i64,
    /// 0-indexed rank within its source list.
    pub rank: usize,
    /// Cosine similarity (`1 - distance`) for vector hits, BM25-derived
    /// relevance for FTS hits. Informational only — fusion uses `rank`.
    pub score: f64,
}

/// A fact with its fused retrieval score and, for the top result when
/// `graph_depth > 0`, an attached subgraph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub fact: Fact,
    pub fused_score: f64,
    pub graph_context: Option<Subgraph>,
}

/// Whether the vector backend served a query or the engine degraded to
/// FTS-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VectorBackendStatus {
    Available,
    Unavailable { reason: String },
}
