use serde::{Deserialize, Serialize};

/// Hybrid retrieval (vector + FTS) fusion configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Reciprocal Rank Fusion rank offset.
    pub rrf_k: u32,
    /// Weight applied to the vector-search rank contribution.
    pub vector_weight: f64,
    /// Weight applied to the full-text-search rank contribution.
    pub text_weight: f64,
    /// Default result count when a caller omits `limit`.
    pub default_limit: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            rrf_k: 60,
            vector_weight: 0.6,
            text_weight: 0.4,
            default_limit: 20,
        }
    }
}
