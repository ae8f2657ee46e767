use serde::{Deserialize, Serialize};

/// Input safety limits enforced at the API boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SafetyLimitsConfig {
    pub content_max_length: usize,
    pub query_max_length: usize,
    pub tags_max_count: usize,
    pub project_max_length: usize,
}

impl Default for SafetyLimitsConfig {
    fn default() -> Self {
        Self {
            content_max_length: 50_000,
            query_max_length: 2_000,
            tags_max_count: 32,
            project_max_length: 256,
        }
    }
}
