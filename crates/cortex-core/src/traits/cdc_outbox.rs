use crate::errors::CortexResult;
use crate::models::GraphOutboxEntry;

/// Queue of graph-relevant mutations for async downstream sync. Local
/// correctness never depends on its drain.
#[allow(async_fn_in_trait)]
pub trait ICdcOutbox: Send + Sync {
    async fn enqueue(&self, fact_id: i64, action: &str) -> CortexResult<i64>;

    async fn lease_pending(&self, limit: usize) -> CortexResult<Vec<GraphOutboxEntry>>;

    async fn mark_processed(&self, entry_id: i64) -> CortexResult<()>;

    async fn mark_failed(&self, entry_id: i64) -> CortexResult<()>;

    async fn pending_count(&self) -> CortexResult<i64>;
}
