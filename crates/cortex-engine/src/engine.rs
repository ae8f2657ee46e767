//! The composed `CortexEngine` facade: wires every subsystem trait
//! implementation into one object exposing the full external API,
//! grounded in the original project's top-level `Cortex` class that
//! glues `FactStore`/`Ledger`/`GraphStore`/`HybridSearch` together
//! behind one entry point.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use cortex_compaction::CompactorImpl;
use cortex_core::config::CortexConfig;
use cortex_core::errors::{CortexError, CortexResult};
use cortex_core::models::{
    CompactionResult, CompactionStrategy, Confidence, Fact, FactType, Ghost, GhostStatus,
    IntegrityReport, PathEdge, SearchQuery, SearchResult, SnapshotInfo, Stats, Subgraph,
};
use cortex_core::traits::{
    Embedder, ICdcOutbox, ICompactor, IFactStore, IGraphStore, IHybridSearch, ILedger,
    ISnapshotManager, RemoteGraphBackend,
};
use cortex_core::validation::{validate_search, validate_store};
use cortex_graph::{CdcOutboxImpl, GraphStoreImpl, NullRemoteGraphBackend};
use cortex_ledger::LedgerImpl;
use cortex_retrieval::HybridSearchImpl;
use cortex_snapshot::SnapshotManagerImpl;
use cortex_storage::{
    embedding_index::EmbeddingIndexImpl, fact_store::FactStoreImpl, fts_index::FtsIndexImpl,
    pool::Pool,
};

use crate::embedder::NullEmbedder;

type Hybrid = HybridSearchImpl<EmbeddingIndexImpl, FtsIndexImpl, FactStoreImpl, GraphStoreImpl>;

/// The embedded memory engine: one SQLite database, every capability
/// wired together. Generic over the embedder so a real
/// model can be plugged in, and over the remote graph backend so a
/// `GraphBackendMode::Remote` deployment can swap in a live client
/// without touching engine logic — both default to the dependency-free
/// stand-ins when a caller doesn't need either.
pub struct CortexEngine<Emb = NullEmbedder, R = NullRemoteGraphBackend> {
    config: CortexConfig,
    pool: Arc<Pool>,
    facts: Arc<FactStoreImpl>,
    embeddings: Arc<EmbeddingIndexImpl>,
    ledger: Arc<LedgerImpl>,
    graph: Arc<GraphStoreImpl>,
    remote_graph: Option<Arc<R>>,
    outbox: Arc<CdcOutboxImpl>,
    hybrid: Hybrid,
    compactor: CompactorImpl<FactStoreImpl>,
    snapshots: SnapshotManagerImpl,
    embedder: Emb,
}

impl CortexEngine<NullEmbedder, NullRemoteGraphBackend> {
    /// Open (creating if absent) a file-backed engine with no embedder
    /// and no remote graph backend wired in.
    pub fn open(path: &Path, config: CortexConfig) -> CortexResult<Self> {
        Self::open_with(path, config, NullEmbedder, None)
    }

    /// In-memory engine for tests and short-lived tooling.
    pub fn open_in_memory(config: CortexConfig) -> CortexResult<Self> {
        Self::open_in_memory_with(config, NullEmbedder, None)
    }
}

impl<Emb, R> CortexEngine<Emb, R>
where
    Emb: Embedder,
    R: RemoteGraphBackend,
{
    pub fn open_with(path: &Path, config: CortexConfig, embedder: Emb, remote_graph: Option<R>) -> CortexResult<Self> {
        let pool = Arc::new(Pool::open(path, &config.storage)?);
        Self::build(pool, config, embedder, remote_graph)
    }

    pub fn open_in_memory_with(config: CortexConfig, embedder: Emb, remote_graph: Option<R>) -> CortexResult<Self> {
        let pool = Arc::new(Pool::open_in_memory(&config.storage)?);
        Self::build(pool, config, embedder, remote_graph)
    }

    fn build(pool: Arc<Pool>, config: CortexConfig, embedder: Emb, remote_graph: Option<R>) -> CortexResult<Self> {
        let facts = Arc::new(FactStoreImpl::new(pool.clone()));
        let embeddings = Arc::new(EmbeddingIndexImpl::new(pool.clone()));
        let fts = Arc::new(FtsIndexImpl::new(pool.clone()));
        let ledger = Arc::new(LedgerImpl::new(pool.clone(), config.ledger.clone()));
        let graph = Arc::new(GraphStoreImpl::new(pool.clone()));
        let outbox = Arc::new(CdcOutboxImpl::new(pool.clone()));
        let hybrid = HybridSearchImpl::new(
            embeddings.clone(),
            fts.clone(),
            facts.clone(),
            graph.clone(),
            config.retrieval.clone(),
        );
        let compactor = CompactorImpl::new(facts.clone(), pool.clone(), config.compaction.clone());
        let snapshots = SnapshotManagerImpl::new(pool.clone())?;

        Ok(Self {
            config,
            pool,
            facts,
            embeddings,
            ledger,
            graph,
            remote_graph: remote_graph.map(Arc::new),
            outbox,
            hybrid,
            compactor,
            snapshots,
            embedder,
        })
    }

    /// Insert a fact, best-effort embed and extract its graph elements,
    /// then seal the write with a ledger transaction. Embedding and graph-extraction failures are
    /// logged and skipped — they never roll back the fact itself.
    #[allow(clippy::too_many_arguments)]
    pub async fn store(
        &self,
        project: &str,
        content: &str,
        fact_type: FactType,
        tags: &[String],
        confidence: Confidence,
        source: Option<&str>,
        meta: serde_json::Value,
        valid_from: Option<DateTime<Utc>>,
    ) -> CortexResult<i64> {
        validate_store(&self.config.safety, project, content, tags)?;

        let fact_id = self
            .facts
            .store(project, content, fact_type, tags, confidence, source, meta, valid_from)
            .await?;

        if self.config.embedding.auto_embed {
            match self.embedder.embed(content).await {
                Ok(vector) => {
                    if let Err(e) = self.embeddings.upsert(fact_id, &vector).await {
                        tracing::warn!(fact_id, error = %e, "embedding upsert failed, skipping");
                    }
                }
                Err(e) => tracing::warn!(fact_id, error = %e, "embedding generation failed, skipping"),
            }
        }

        if let Err(e) = self.upsert_graph(fact_id, project, content).await {
            tracing::warn!(fact_id, error = %e, "graph extraction failed, skipping");
        }

        let detail = serde_json::json!({
            "fact_id": fact_id,
            "project": project,
            "fact_type": fact_type.as_str(),
            "content": content,
        });
        let tx_id = self.ledger.append(project, "store", detail).await?;
        self.facts.set_tx_id(fact_id, tx_id).await?;
        self.outbox.enqueue(fact_id, "store").await?;
        self.maybe_checkpoint().await;

        Ok(fact_id)
    }

    /// Supersede an existing fact: store a new one carrying
    /// `previous_fact_id` in its meta, then deprecate the old one
    /// pointing forward. Never mutates the old row's content in place
    ///).
    pub async fn update(
        &self,
        fact_id: i64,
        content: Option<&str>,
        tags: Option<&[String]>,
        meta: Option<serde_json::Value>,
    ) -> CortexResult<i64> {
        let existing = self
            .facts
            .get(fact_id)
            .await?
            .ok_or_else(|| CortexError::NotFound(format!("fact {fact_id}")))?;

        let new_content = content.unwrap_or(&existing.content);
        let new_tags: Vec<String> = match tags {
            Some(t) => t.to_vec(),
            None => existing.tags.iter().cloned().collect(),
        };
        let mut new_meta = meta.unwrap_or_else(|| {
            serde_json::to_value(&existing.meta).unwrap_or_else(|_| serde_json::json!({}))
        });
        if let Some(obj) = new_meta.as_object_mut() {
            obj.insert(
                cortex_core::models::meta_keys::PREVIOUS_FACT_ID.to_string(),
                serde_json::json!(fact_id),
            );
        }

        let new_id = self
            .store(
                &existing.project,
                new_content,
                existing.fact_type,
                &new_tags,
                existing.confidence,
                existing.source.as_deref(),
                new_meta,
                None,
            )
            .await?;

        self.deprecate(fact_id, Some(&format!("superseded_by:#{new_id}"))).await?;
        Ok(new_id)
    }

    pub async fn deprecate(&self, fact_id: i64, reason: Option<&str>) -> CortexResult<bool> {
        let deprecated = self.facts.deprecate(fact_id, reason).await?;
        if deprecated {
            self.graph.delete_fact_elements(fact_id).await?;
            let detail = serde_json::json!({ "fact_id": fact_id, "reason": reason });
            self.ledger.append("_system", "deprecate", detail).await?;
            self.outbox.enqueue(fact_id, "delete").await?;
            self.maybe_checkpoint().await;
        }
        Ok(deprecated)
    }

    pub async fn get(&self, fact_id: i64) -> CortexResult<Option<Fact>> {
        self.facts.get(fact_id).await
    }

    pub async fn recall(&self, project: &str, limit: Option<usize>, offset: Option<usize>) -> CortexResult<Vec<Fact>> {
        self.facts.recall(project, limit, offset).await
    }

    pub async fn history(&self, project: &str, as_of: Option<DateTime<Utc>>) -> CortexResult<Vec<Fact>> {
        self.facts.history(project, as_of).await
    }

    /// Rebuild the set of facts visible as of a past transaction.
    pub async fn time_travel(&self, target_tx_id: i64, project: Option<&str>) -> CortexResult<Vec<Fact>> {
        self.facts.reconstruct_state(target_tx_id, project).await
    }

    pub async fn register_ghost(&self, reference: &str, context: &str, project: &str) -> CortexResult<i64> {
        self.facts.register_ghost(reference, context, project).await
    }

    pub async fn resolve_ghost(
        &self,
        ghost_id: i64,
        target_entity: Option<&str>,
        confidence: Option<f64>,
    ) -> CortexResult<()> {
        self.facts.resolve_ghost(ghost_id, target_entity, confidence).await
    }

    pub async fn get_ghost(&self, ghost_id: i64) -> CortexResult<Option<Ghost>> {
        self.facts.get_ghost(ghost_id).await
    }

    pub async fn list_ghosts(&self, project: &str, status: Option<GhostStatus>) -> CortexResult<Vec<Ghost>> {
        self.facts.list_ghosts(project, status).await
    }

    /// Hybrid vector + text search. If the caller didn't already supply
    /// `query_embedding` and auto-embedding is on, embeds the query text
    /// first; embedding failure degrades to text-only rather than
    /// failing the search.
    pub async fn search(&self, mut query: SearchQuery) -> CortexResult<Vec<SearchResult>> {
        validate_search(&self.config.safety, &query.query)?;

        if query.query_embedding.is_none() && self.config.embedding.auto_embed {
            match self.embedder.embed(&query.query).await {
                Ok(vector) => query.query_embedding = Some(vector),
                Err(e) => tracing::warn!(error = %e, "query embedding failed, falling back to text-only"),
            }
        }

        self.hybrid.search(query).await
    }

    pub async fn query_entity(&self, name: &str, project: Option<&str>) -> CortexResult<Option<Subgraph>> {
        self.graph.query_entity(name, project).await
    }

    pub async fn find_path(&self, source_name: &str, target_name: &str, max_depth: u32) -> CortexResult<Option<Vec<PathEdge>>> {
        self.graph.find_path(source_name, target_name, max_depth).await
    }

    pub async fn get_context_subgraph(&self, seeds: &[String], depth: u32, max_nodes: usize) -> CortexResult<Subgraph> {
        self.graph.get_context_subgraph(seeds, depth, max_nodes).await
    }

    /// Records a trust signal and appends a ledger entry.
    pub async fn vote(&self, fact_id: i64, agent_id: &str, value: i8, weight: f64, reputation_at_vote: f64) -> CortexResult<f64> {
        let score = self.facts.vote(fact_id, agent_id, value, weight, reputation_at_vote).await?;
        let detail = serde_json::json!({ "fact_id": fact_id, "agent_id": agent_id, "value": value });
        self.ledger.append("_system", "vote", detail).await?;
        self.maybe_checkpoint().await;
        Ok(score)
    }

    pub async fn verify_ledger(&self) -> CortexResult<IntegrityReport> {
        self.ledger.verify_integrity().await
    }

    pub async fn compact(&self, project: &str, strategies: &[CompactionStrategy], dry_run: bool) -> CortexResult<CompactionResult> {
        self.compactor.compact(project, strategies, dry_run).await
    }

    pub async fn create_snapshot(&self, name: &str) -> CortexResult<SnapshotInfo> {
        self.snapshots.create_snapshot(name).await
    }

    pub async fn list_snapshots(&self) -> CortexResult<Vec<SnapshotInfo>> {
        self.snapshots.list_snapshots().await
    }

    pub async fn restore_snapshot(&self, name: &str) -> CortexResult<()> {
        self.snapshots.restore_snapshot(name).await
    }

    /// Drain up to `limit` pending CDC entries toward the configured
    /// remote graph backend. No-op (every entry stays pending) when no
    /// remote backend is configured.
    pub async fn process_outbox(&self, limit: usize) -> CortexResult<usize> {
        let Some(remote) = &self.remote_graph else {
            return Ok(0);
        };

        let entries = self.outbox.lease_pending(limit).await?;
        let mut processed = 0;
        for entry in entries {
            let result = match entry.action.as_str() {
                "delete" => remote.delete_fact_elements(entry.fact_id).await,
                _ => {
                    // Graph elements for this fact were already upserted locally;
                    // re-extract from the fact's content to replay onto the remote side.
                    match self.facts.get(entry.fact_id).await? {
                        Some(fact) => self.replay_remote(remote, &fact).await,
                        None => Ok(()),
                    }
                }
            };

            match result {
                Ok(()) => {
                    self.outbox.mark_processed(entry.id).await?;
                    processed += 1;
                }
                Err(e) => {
                    tracing::warn!(entry_id = entry.id, error = %e, "remote graph replay failed");
                    self.outbox.mark_failed(entry.id).await?;
                }
            }
        }
        Ok(processed)
    }

    /// Row counts across every table plus the on-disk database size.
    pub async fn stats(&self) -> CortexResult<Stats> {
        let pending_outbox_count = self.outbox.pending_count().await?;
        let database_size_bytes = std::fs::metadata(self.pool.path()).map(|m| m.len() as i64).unwrap_or(0);

        self.pool
            .with_reader(move |conn| {
                let count = |sql: &str| -> rusqlite::Result<i64> { conn.query_row(sql, [], |row| row.get(0)) };
                Ok(Stats {
                    fact_count: count("SELECT COUNT(*) FROM facts").map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    active_fact_count: count("SELECT COUNT(*) FROM facts WHERE valid_until IS NULL")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    transaction_count: count("SELECT COUNT(*) FROM transactions")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    checkpoint_count: count("SELECT COUNT(*) FROM merkle_roots")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    entity_count: count("SELECT COUNT(*) FROM entities")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    relation_count: count("SELECT COUNT(*) FROM entity_relations")
                        .map_err(|e| cortex_storage::to_storage_err(e.to_string()))?,
                    pending_outbox_count,
                    database_size_bytes,
                })
            })
            .await
    }

    async fn upsert_graph(&self, fact_id: i64, project: &str, content: &str) -> CortexResult<()> {
        let extracted = cortex_graph::extract(content);
        let now = Utc::now();
        let mut ids = std::collections::HashMap::new();

        for entity in &extracted.entities {
            let id = self.graph.upsert_entity(&entity.name, &entity.entity_type, project, now).await?;
            ids.insert(entity.name.clone(), id);

            if let Some(remote) = &self.remote_graph {
                if let Err(e) = remote.upsert_entity(&entity.name, &entity.entity_type, project, now).await {
                    tracing::warn!(entity = %entity.name, error = %e, "remote entity upsert failed, routing via outbox");
                    self.outbox.enqueue(fact_id, "upsert").await?;
                }
            }
        }

        for relation in &extracted.relations {
            let (Some(&source_id), Some(&target_id)) =
                (ids.get(&relation.source_name), ids.get(&relation.target_name))
            else {
                continue;
            };
            self.graph
                .upsert_relation(source_id, target_id, &relation.relation_type, fact_id, now)
                .await?;

            if let Some(remote) = &self.remote_graph {
                if let Err(e) = remote
                    .upsert_relation(&relation.source_name, &relation.target_name, &relation.relation_type, fact_id, now)
                    .await
                {
                    tracing::warn!(error = %e, "remote relation upsert failed, routing via outbox");
                    self.outbox.enqueue(fact_id, "upsert").await?;
                }
            }
        }

        Ok(())
    }

    async fn replay_remote(&self, remote: &Arc<R>, fact: &Fact) -> CortexResult<()> {
        let extracted = cortex_graph::extract(&fact.content);
        let now = Utc::now();
        for entity in &extracted.entities {
            remote.upsert_entity(&entity.name, &entity.entity_type, &fact.project, now).await?;
        }
        for relation in &extracted.relations {
            remote
                .upsert_relation(&relation.source_name, &relation.target_name, &relation.relation_type, fact.id, now)
                .await?;
        }
        Ok(())
    }

    /// Best-effort checkpoint attempt after every ledger append; a no-op
    /// below the adaptive batch threshold.
    async fn maybe_checkpoint(&self) {
        match self.ledger.create_checkpoint().await {
            Ok(Some(cp)) => tracing::debug!(checkpoint_id = cp.id, tx_count = cp.tx_count, "checkpoint formed"),
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "checkpoint attempt failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> CortexEngine {
        CortexEngine::open_in_memory(CortexConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn store_then_recall_roundtrips() {
        let e = engine();
        let id = e
            .store("proj", "the cortex engine uses SQLite", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let recalled = e.recall("proj", None, None).await.unwrap();
        assert!(recalled.iter().any(|f| f.id == id));
    }

    #[tokio::test]
    async fn store_extracts_graph_entities() {
        let e = engine();
        e.store("proj", "cortex.rs uses SQLite for storage", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let entity = e.query_entity("cortex.rs", Some("proj")).await.unwrap();
        assert!(entity.is_some());
    }

    #[tokio::test]
    async fn graph_extraction_yields_entities_and_uses_relation() {
        let e = engine();
        e.store("proj", "CortexEngine uses SQLite and FastAPI", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let subgraph = e
            .get_context_subgraph(&["CortexEngine".to_string()], 1, 10)
            .await
            .unwrap();

        let names: Vec<&str> = subgraph.entities.iter().map(|n| n.name.as_str()).collect();
        assert!(names.contains(&"CortexEngine"));
        assert!(names.iter().any(|n| n.eq_ignore_ascii_case("sqlite")));
        assert!(names.iter().any(|n| n.eq_ignore_ascii_case("fastapi")));
        assert!(subgraph.relations.iter().any(|r| r.relation_type == "uses"));
    }

    #[tokio::test]
    async fn update_supersedes_without_mutating_original() {
        let e = engine();
        let id1 = e
            .store("proj", "first version", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let id2 = e.update(id1, Some("second version"), None, None).await.unwrap();
        assert_ne!(id1, id2);

        let original = e.get(id1).await.unwrap().unwrap();
        assert_eq!(original.content, "first version");
        assert!(!original.is_active());

        let superseding = e.get(id2).await.unwrap().unwrap();
        assert_eq!(superseding.content, "second version");
        assert!(superseding.is_active());
    }

    #[tokio::test]
    async fn deprecate_removes_graph_elements() {
        let e = engine();
        let id = e.store("proj", "boom.rs has a bug", FactType::Error, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        e.deprecate(id, Some("fixed")).await.unwrap();

        let fact = e.get(id).await.unwrap().unwrap();
        assert!(!fact.is_active());
    }

    #[tokio::test]
    async fn search_finds_stored_fact_via_text() {
        let e = engine();
        e.store("proj", "the retry policy uses exponential backoff", FactType::Rule, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let results = e
            .search(SearchQuery {
                query: "backoff".to_string(),
                query_embedding: None,
                top_k: 5,
                project: Some("proj".to_string()),
                as_of: None,
                graph_depth: 0,
            })
            .await
            .unwrap();
        assert!(!results.is_empty());
    }

    #[tokio::test]
    async fn verify_ledger_is_valid_after_writes() {
        let e = engine();
        e.store("proj", "fact one", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        e.store("proj", "fact two", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let report = e.verify_ledger().await.unwrap();
        assert!(report.valid);
    }

    #[tokio::test]
    async fn process_outbox_without_remote_backend_is_noop() {
        let e = engine();
        e.store("proj", "fact one", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let processed = e.process_outbox(10).await.unwrap();
        assert_eq!(processed, 0);
    }

    #[tokio::test]
    async fn stats_reflects_fact_count() {
        let e = engine();
        e.store("proj", "fact one", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let stats = e.stats().await.unwrap();
        assert!(stats.fact_count >= 1);
        assert!(stats.active_fact_count >= 1);
    }
}
