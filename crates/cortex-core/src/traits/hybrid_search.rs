use crate::errors::CortexResult;
use crate::models::{SearchQuery, SearchResult};

/// RRF fusion of vector + text search, with optional graph enrichment.
#[allow(async_fn_in_trait)]
pub trait IHybridSearch: Send + Sync {
    async fn search(&self, query: SearchQuery) -> CortexResult<Vec<SearchResult>>;
}
