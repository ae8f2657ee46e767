//! Default `RemoteGraphBackend`: no remote graph service configured.
//!
//! Every call fails with [`GraphError::RemoteUnavailable`], routing the
//! mutation to the CDC outbox instead of blocking the local write path.

use chrono::{DateTime, Utc};

use cortex_core::errors::{CortexError, CortexResult, GraphError};
use cortex_core::models::{PathEdge, Subgraph};
use cortex_core::traits::RemoteGraphBackend;

#[derive(Debug, Default)]
pub struct NullRemoteGraphBackend;

fn unavailable<T>() -> CortexResult<T> {
    Err(CortexError::from(GraphError::RemoteUnavailable {
        reason: "no remote graph backend configured".to_string(),
    }))
}

impl RemoteGraphBackend for NullRemoteGraphBackend {
    async fn upsert_entity(
        &self,
        _name: &str,
        _entity_type: &str,
        _project: &str,
        _ts: DateTime<Utc>,
    ) -> CortexResult<()> {
        unavailable()
    }

    async fn upsert_relation(
        &self,
        _source_name: &str,
        _target_name: &str,
        _relation_type: &str,
        _fact_id: i64,
        _ts: DateTime<Utc>,
    ) -> CortexResult<()> {
        unavailable()
    }

    async fn delete_fact_elements(&self, _fact_id: i64) -> CortexResult<()> {
        unavailable()
    }

    async fn find_path(
        &self,
        _source_name: &str,
        _target_name: &str,
        _max_depth: u32,
    ) -> CortexResult<Option<Vec<PathEdge>>> {
        unavailable()
    }

    async fn find_context_subgraph(
        &self,
        _seeds: &[String],
        _depth: u32,
        _max_nodes: usize,
    ) -> CortexResult<Subgraph> {
        unavailable()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_call_reports_unavailable() {
        let backend = NullRemoteGraphBackend;
        let err = backend
            .upsert_entity("a", "tool", "p", Utc::now())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unavailable"));
    }
}
