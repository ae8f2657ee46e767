use crate::errors::CortexResult;
use crate::models::KnnHit;

/// Per-fact vector storage and KNN lookup, 1:1 with fact lifecycle.
#[allow(async_fn_in_trait)]
pub trait IEmbeddingIndex: Send + Sync {
    async fn upsert(&self, fact_id: i64, vector: &[f32]) -> CortexResult<()>;

    async fn knn(
        &self,
        query_vector: &[f32],
        k: usize,
        project: Option<&str>,
    ) -> CortexResult<Vec<KnnHit>>;

    async fn remove(&self, fact_id: i64) -> CortexResult<()>;
}

/// A text embedder external to the core engine. Best-effort: failures are logged by the caller and the
/// embedding is skipped, never propagated as a store failure.
#[allow(async_fn_in_trait)]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> CortexResult<Vec<f32>>;

    async fn embed_batch(&self, texts: &[String]) -> CortexResult<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }
}
