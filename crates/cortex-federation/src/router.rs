//! `IFederationRouter` implementation: one `CortexEngine` per tenant
//! `.db` file under a shard directory, lazily created on first access
//! and cached behind a shard-router lock, grounded in the original
//! project's `FederatedEngine`/`get_shard`.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use regex::Regex;
use tokio::sync::RwLock;

use cortex_core::config::CortexConfig;
use cortex_core::errors::{CortexError, CortexResult, FederationError};
use cortex_core::models::{Confidence, FactType, SearchQuery, SearchResult};
use cortex_core::traits::{Embedder, IFederationRouter};
use cortex_engine::{CortexEngine, NullEmbedder};
use cortex_graph::NullRemoteGraphBackend;

fn tenant_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z0-9_-]{1,128}$").expect("static tenant id pattern is valid regex"))
}

/// Reject anything outside `[A-Za-z0-9_-]{1,128}` rather than
/// substituting/truncating it into shape — a deliberate divergence from
/// the original project's `_sanitize_tenant_id`, which replaces invalid
/// characters with `_` and silently truncates to 128 chars (see
/// DESIGN.md's Open Questions).
fn validate_tenant_id(tenant_id: &str) -> CortexResult<()> {
    if tenant_id_pattern().is_match(tenant_id) {
        Ok(())
    } else {
        Err(CortexError::from(FederationError::InvalidTenantId(tenant_id.to_string())))
    }
}

type Shard<Emb> = Arc<CortexEngine<Emb, NullRemoteGraphBackend>>;

/// Routes `store`/`search` to per-tenant shard engines. In `single` mode
/// (`FederationMode::Single`) every call is routed to one implicit shard
/// named `_single` at `config.storage.database_path`, matching the
/// original's default (non-federated) behavior without a special code
/// path.
pub struct FederationRouterImpl<Emb = NullEmbedder> {
    shard_dir: PathBuf,
    config: CortexConfig,
    embedder: Emb,
    shards: RwLock<HashMap<String, Shard<Emb>>>,
}

impl FederationRouterImpl<NullEmbedder> {
    pub fn new(shard_dir: PathBuf, config: CortexConfig) -> CortexResult<Self> {
        Self::with_embedder(shard_dir, config, NullEmbedder)
    }
}

impl<Emb> FederationRouterImpl<Emb>
where
    Emb: Embedder + Clone,
{
    pub fn with_embedder(shard_dir: PathBuf, config: CortexConfig, embedder: Emb) -> CortexResult<Self> {
        std::fs::create_dir_all(&shard_dir)
            .map_err(|e| CortexError::from(FederationError::ShardUnavailable {
                tenant: "*".to_string(),
                reason: e.to_string(),
            }))?;
        Ok(Self { shard_dir, config, embedder, shards: RwLock::new(HashMap::new()) })
    }

    /// Get or lazily create the shard engine for `tenant_id`.
    async fn get_shard(&self, tenant_id: &str) -> CortexResult<Shard<Emb>> {
        validate_tenant_id(tenant_id)?;

        if let Some(shard) = self.shards.read().await.get(tenant_id) {
            return Ok(shard.clone());
        }

        let mut shards = self.shards.write().await;
        if let Some(shard) = shards.get(tenant_id) {
            return Ok(shard.clone());
        }

        let db_path = self.shard_dir.join(format!("{tenant_id}.db"));
        let engine = CortexEngine::open_with(&db_path, self.config.clone(), self.embedder.clone(), None)?;
        let engine = Arc::new(engine);
        shards.insert(tenant_id.to_string(), engine.clone());
        tracing::info!(tenant_id, path = %db_path.display(), "federation: initialized shard");
        Ok(engine)
    }

    pub async fn shard_count(&self) -> usize {
        self.shards.read().await.len()
    }

    pub async fn tenants(&self) -> Vec<String> {
        self.shards.read().await.keys().cloned().collect()
    }
}

impl<Emb> IFederationRouter for FederationRouterImpl<Emb>
where
    Emb: Embedder + Clone,
{
    async fn store(&self, tenant: &str, project: &str, content: &str) -> CortexResult<i64> {
        let shard = self.get_shard(tenant).await?;
        shard
            .store(
                project,
                content,
                FactType::Knowledge,
                &[],
                Confidence::Stated,
                None,
                serde_json::json!({}),
                None,
            )
            .await
    }

    async fn search(&self, query: &str, tenant: Option<&str>, top_k: usize) -> CortexResult<Vec<SearchResult>> {
        let search_query = |project: Option<String>| SearchQuery {
            query: query.to_string(),
            query_embedding: None,
            top_k,
            project,
            as_of: None,
            graph_depth: 0,
        };

        if let Some(tenant) = tenant {
            let shard = self.get_shard(tenant).await?;
            return shard.search(search_query(None)).await;
        }

        // Cross-shard fan-out: every currently-initialized shard is queried
        // concurrently, results merged by descending fused score, ties
        // broken by shard iteration order.
        let shards: Vec<Shard<Emb>> = self.shards.read().await.values().cloned().collect();
        if shards.is_empty() {
            return Ok(Vec::new());
        }

        let mut tasks = Vec::with_capacity(shards.len());
        for shard in shards {
            let q = search_query(None);
            tasks.push(tokio::spawn(async move { shard.search(q).await }));
        }

        let mut merged: Vec<SearchResult> = Vec::new();
        for task in tasks {
            match task.await {
                Ok(Ok(mut hits)) => merged.append(&mut hits),
                Ok(Err(e)) => tracing::warn!(error = %e, "cross-shard search error"),
                Err(e) => tracing::warn!(error = %e, "cross-shard search task panicked"),
            }
        }
        merged.sort_by(|a, b| b.fused_score.partial_cmp(&a.fused_score).unwrap_or(std::cmp::Ordering::Equal));
        merged.truncate(top_k.max(1));
        Ok(merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_tenant_id_with_invalid_characters() {
        let dir = tempfile::tempdir().unwrap();
        let router = FederationRouterImpl::new(dir.path().join("shards"), CortexConfig::default()).unwrap();
        let err = router.store("bad tenant!", "proj", "hello").await.unwrap_err();
        assert!(matches!(err, CortexError::Federation(FederationError::InvalidTenantId(_))));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized_tenant_ids() {
        let dir = tempfile::tempdir().unwrap();
        let router = FederationRouterImpl::new(dir.path().join("shards"), CortexConfig::default()).unwrap();
        assert!(router.store("", "proj", "hello").await.is_err());
        let long_id = "a".repeat(129);
        assert!(router.store(&long_id, "proj", "hello").await.is_err());
    }

    #[tokio::test]
    async fn store_creates_one_shard_per_tenant() {
        let dir = tempfile::tempdir().unwrap();
        let router = FederationRouterImpl::new(dir.path().join("shards"), CortexConfig::default()).unwrap();
        router.store("tenant-a", "proj", "alpha fact").await.unwrap();
        router.store("tenant-b", "proj", "beta fact").await.unwrap();
        assert_eq!(router.shard_count().await, 2);
    }

    #[tokio::test]
    async fn single_tenant_search_only_sees_its_own_shard() {
        let dir = tempfile::tempdir().unwrap();
        let router = FederationRouterImpl::new(dir.path().join("shards"), CortexConfig::default()).unwrap();
        router.store("tenant-a", "proj", "the widget uses rust").await.unwrap();
        router.store("tenant-b", "proj", "the gadget uses rust").await.unwrap();

        let results = router.search("widget", Some("tenant-a"), 5).await.unwrap();
        assert!(results.iter().any(|r| r.fact.content.contains("widget")));
        assert!(!results.iter().any(|r| r.fact.content.contains("gadget")));
    }

    #[tokio::test]
    async fn cross_shard_search_merges_results() {
        let dir = tempfile::tempdir().unwrap();
        let router = FederationRouterImpl::new(dir.path().join("shards"), CortexConfig::default()).unwrap();
        router.store("tenant-a", "proj", "rust is fast").await.unwrap();
        router.store("tenant-b", "proj", "rust is safe").await.unwrap();

        let results = router.search("rust", None, 10).await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
