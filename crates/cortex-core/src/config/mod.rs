mod compaction_config;
mod embedding_config;
mod federation_config;
mod graph_config;
mod ledger_config;
mod retrieval_config;
mod safety_config;
mod storage_config;

pub use compaction_config::CompactionConfig;
pub use embedding_config::EmbeddingConfig;
pub use federation_config::{FederationConfig, FederationMode};
pub use graph_config::{GraphBackendMode, GraphConfig};
pub use ledger_config::LedgerConfig;
pub use retrieval_config::RetrievalConfig;
pub use safety_config::SafetyLimitsConfig;
pub use storage_config::StorageConfig;

use serde::{Deserialize, Serialize};

/// Top-level configuration aggregating every subsystem config.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CortexConfig {
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub retrieval: RetrievalConfig,
    pub ledger: LedgerConfig,
    pub graph: GraphConfig,
    pub compaction: CompactionConfig,
    pub federation: FederationConfig,
    pub safety: SafetyLimitsConfig,
}

impl CortexConfig {
    /// Load config from a TOML string, defaulting any field or whole
    /// section the input omits.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }
}
