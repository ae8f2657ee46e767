use chrono::{DateTime, Utc};

use crate::errors::CortexResult;
use crate::models::{Entity, PathEdge, Relation, Subgraph};

/// Entity/relation upsert, subgraph expansion, shortest-path.
/// Dual-backend capable: a local implementation and an optional
/// [`RemoteGraphBackend`] both receive the same mutations.
#[allow(async_fn_in_trait)]
pub trait IGraphStore: Send + Sync {
    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        project: &str,
        ts: DateTime<Utc>,
    ) -> CortexResult<i64>;

    async fn upsert_relation(
        &self,
        source_id: i64,
        target_id: i64,
        relation_type: &str,
        fact_id: i64,
        ts: DateTime<Utc>,
    ) -> CortexResult<i64>;

    async fn get_graph(&self, project: Option<&str>, limit: usize) -> CortexResult<Subgraph>;

    async fn query_entity(&self, name: &str, project: Option<&str>) -> CortexResult<Option<Subgraph>>;

    /// Undirected BFS up to `max_depth`. Intentionally asymmetric with
    /// [`RemoteGraphBackend::find_path`], which may be directed.
    async fn find_path(
        &self,
        source_name: &str,
        target_name: &str,
        max_depth: u32,
    ) -> CortexResult<Option<Vec<PathEdge>>>;

    async fn get_context_subgraph(
        &self,
        seeds: &[String],
        depth: u32,
        max_nodes: usize,
    ) -> CortexResult<Subgraph>;

    async fn delete_fact_elements(&self, fact_id: i64) -> CortexResult<()>;
}

/// Optional remote graph backend. Failures route through the
/// CDC outbox rather than failing the caller's write.
#[allow(async_fn_in_trait)]
pub trait RemoteGraphBackend: Send + Sync {
    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        project: &str,
        ts: DateTime<Utc>,
    ) -> CortexResult<()>;

    async fn upsert_relation(
        &self,
        source_name: &str,
        target_name: &str,
        relation_type: &str,
        fact_id: i64,
        ts: DateTime<Utc>,
    ) -> CortexResult<()>;

    async fn delete_fact_elements(&self, fact_id: i64) -> CortexResult<()>;

    /// May be directed, unlike the local store's undirected BFS.
    async fn find_path(
        &self,
        source_name: &str,
        target_name: &str,
        max_depth: u32,
    ) -> CortexResult<Option<Vec<PathEdge>>>;

    async fn find_context_subgraph(
        &self,
        seeds: &[String],
        depth: u32,
        max_nodes: usize,
    ) -> CortexResult<Subgraph>;
}
