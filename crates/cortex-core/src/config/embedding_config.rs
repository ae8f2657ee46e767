use serde::{Deserialize, Serialize};

/// Embedding subsystem configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Whether `store` automatically embeds facts via the configured `Embedder`.
    pub auto_embed: bool,
    /// Fixed vector dimension every embedding in this engine must match.
    pub embeddings_dimension: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            auto_embed: false,
            embeddings_dimension: 384,
        }
    }
}
