use crate::errors::CortexResult;
use crate::models::SearchResult;

/// Per-tenant shard selection and cross-shard merge.
#[allow(async_fn_in_trait)]
pub trait IFederationRouter: Send + Sync {
    async fn store(&self, tenant: &str, project: &str, content: &str) -> CortexResult<i64>;

    async fn search(
        &self,
        query: &str,
        tenant: Option<&str>,
        top_k: usize,
    ) -> CortexResult<Vec<SearchResult>>;
}
