use serde::{Deserialize, Serialize};

/// Which graph backend entity/relation upserts are routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphBackendMode {
    /// Entities and relations live in the local SQLite graph tables only.
    Local,
    /// Writes dual-write to a `RemoteGraphBackend`; failures queue to the CDC outbox.
    Remote,
}

impl Default for GraphBackendMode {
    fn default() -> Self {
        GraphBackendMode::Local
    }
}

/// Graph extraction and storage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub backend: GraphBackendMode,
    /// Default neighborhood depth for `find_context_subgraph`.
    pub default_subgraph_depth: u32,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            backend: GraphBackendMode::Local,
            default_subgraph_depth: 2,
        }
    }
}
