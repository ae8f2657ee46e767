use serde::{Deserialize, Serialize};

/// Whether the engine serves one tenant or routes across per-tenant shards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FederationMode {
    /// One implicit shard at `storage.database_path`.
    Single,
    /// One SQLite file per tenant under `shard_dir`.
    Federated,
}

impl Default for FederationMode {
    fn default() -> Self {
        FederationMode::Single
    }
}

/// Federation/sharding configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FederationConfig {
    pub mode: FederationMode,
    /// Directory holding per-tenant shard database files when `mode` is `federated`.
    pub shard_dir: String,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            mode: FederationMode::Single,
            shard_dir: "shards".to_string(),
        }
    }
}
