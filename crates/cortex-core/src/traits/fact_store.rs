use chrono::{DateTime, Utc};

use crate::errors::CortexResult;
use crate::models::{Confidence, Fact, FactType, Ghost, GhostStatus};

/// Insert/update/deprecate/supersede facts; owner of the `facts` table
/// invariants.
#[allow(async_fn_in_trait)]
pub trait IFactStore: Send + Sync {
    #[allow(clippy::too_many_arguments)]
    async fn store(
        &self,
        project: &str,
        content: &str,
        fact_type: FactType,
        tags: &[String],
        confidence: Confidence,
        source: Option<&str>,
        meta: serde_json::Value,
        valid_from: Option<DateTime<Utc>>,
    ) -> CortexResult<i64>;

    /// Supersede an existing fact: store a new row carrying
    /// `previous_fact_id` in its meta, then deprecate the old one
    /// pointing forward. Never mutates a fact's content/tags/meta in
    /// place. Does not append a ledger transaction or touch the graph;
    /// the engine-level `update` wraps this with that bookkeeping.
    async fn update(
        &self,
        fact_id: i64,
        content: Option<&str>,
        tags: Option<&[String]>,
        meta: Option<serde_json::Value>,
    ) -> CortexResult<i64>;

    async fn deprecate(&self, fact_id: i64, reason: Option<&str>) -> CortexResult<bool>;

    /// Back-fills the creating transaction id once the ledger append
    /// completes.
    async fn set_tx_id(&self, fact_id: i64, tx_id: i64) -> CortexResult<()>;

    async fn get(&self, fact_id: i64) -> CortexResult<Option<Fact>>;

    async fn recall(
        &self,
        project: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> CortexResult<Vec<Fact>>;

    async fn history(&self, project: &str, as_of: Option<DateTime<Utc>>) -> CortexResult<Vec<Fact>>;

    async fn reconstruct_state(
        &self,
        target_tx_id: i64,
        project: Option<&str>,
    ) -> CortexResult<Vec<Fact>>;

    async fn register_ghost(
        &self,
        reference: &str,
        context: &str,
        project: &str,
    ) -> CortexResult<i64>;

    async fn resolve_ghost(
        &self,
        ghost_id: i64,
        target_entity: Option<&str>,
        confidence: Option<f64>,
    ) -> CortexResult<()>;

    async fn get_ghost(&self, ghost_id: i64) -> CortexResult<Option<Ghost>>;

    async fn list_ghosts(&self, project: &str, status: Option<GhostStatus>) -> CortexResult<Vec<Ghost>>;

    /// Records a trust signal and returns the fact's new observable
    /// `consensus_score`. Writes land in `consensus_votes_v2`, the unbounded
    /// accumulation path; `Fact::consensus_score` clamps at read time.
    async fn vote(
        &self,
        fact_id: i64,
        agent_id: &str,
        value: i8,
        weight: f64,
        reputation_at_vote: f64,
    ) -> CortexResult<f64>;
}
