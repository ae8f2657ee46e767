//! `IHybridSearch` implementation: Reciprocal Rank Fusion over vector
//! KNN and FTS5, with optional graph-context enrichment of the top hit,
//! grounded in `search/hybrid.py`.

use std::collections::HashMap;
use std::sync::Arc;

use cortex_core::config::RetrievalConfig;
use cortex_core::errors::CortexResult;
use cortex_core::models::{SearchQuery, SearchResult};
use cortex_core::traits::{IEmbeddingIndex, IFactStore, IFtsIndex, IGraphStore, IHybridSearch};

pub struct HybridSearchImpl<E, F, S, G> {
    embeddings: Arc<E>,
    fts: Arc<F>,
    facts: Arc<S>,
    graph: Arc<G>,
    config: RetrievalConfig,
}

impl<E, F, S, G> HybridSearchImpl<E, F, S, G>
where
    E: IEmbeddingIndex,
    F: IFtsIndex,
    S: IFactStore,
    G: IGraphStore,
{
    pub fn new(embeddings: Arc<E>, fts: Arc<F>, facts: Arc<S>, graph: Arc<G>, config: RetrievalConfig) -> Self {
        Self { embeddings, fts, facts, graph, config }
    }
}

impl<E, F, S, G> IHybridSearch for HybridSearchImpl<E, F, S, G>
where
    E: IEmbeddingIndex,
    F: IFtsIndex,
    S: IFactStore,
    G: IGraphStore,
{
    async fn search(&self, query: SearchQuery) -> CortexResult<Vec<SearchResult>> {
        let fanout = query.top_k.saturating_mul(2).max(1);
        let project = query.project.as_deref();

        let vector_hits = if let Some(embedding) = &query.query_embedding {
            self.embeddings.knn(embedding, fanout, project).await?
        } else {
            Vec::new()
        };
        let text_hits = self.fts.search(&query.query, fanout, project).await?;

        let mut rrf_scores: HashMap<i64, f64> = HashMap::new();
        let mut order: Vec<i64> = Vec::new();

        for (rank, hit) in vector_hits.iter().enumerate() {
            let contribution = self.config.vector_weight / (self.config.rrf_k as f64 + rank as f64 + 1.0);
            if rrf_scores.insert(hit.fact_id, contribution).is_none() {
                order.push(hit.fact_id);
            } else {
                *rrf_scores.get_mut(&hit.fact_id).unwrap() += contribution;
            }
        }

        for (rank, hit) in text_hits.iter().enumerate() {
            let contribution = self.config.text_weight / (self.config.rrf_k as f64 + rank as f64 + 1.0);
            *rrf_scores.entry(hit.fact_id).or_insert_with(|| {
                order.push(hit.fact_id);
                0.0
            }) += contribution;
        }

        let mut ranked: Vec<i64> = order;
        ranked.sort_by(|a, b| {
            rrf_scores
                .get(b)
                .partial_cmp(&rrf_scores.get(a))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        ranked.truncate(query.top_k.max(1));

        let mut results = Vec::with_capacity(ranked.len());
        for (i, fact_id) in ranked.into_iter().enumerate() {
            let Some(fact) = self.facts.get(fact_id).await? else { continue };
            let fused_score = rrf_scores[&fact_id];

            let graph_context = if i == 0 && query.graph_depth > 0 {
                let seeds: Vec<String> = fact.tags.iter().cloned().collect();
                if seeds.is_empty() {
                    None
                } else {
                    self.graph
                        .get_context_subgraph(&seeds, query.graph_depth, 50)
                        .await
                        .ok()
                }
            } else {
                None
            };

            results.push(SearchResult { fact, fused_score, graph_context });
        }

        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cortex_core::config::StorageConfig;
    use cortex_core::models::{Confidence, FactType};
    use cortex_graph::GraphStoreImpl;
    use cortex_storage::{embedding_index::EmbeddingIndexImpl, fact_store::FactStoreImpl, fts_index::FtsIndexImpl, pool::Pool};

    async fn harness() -> HybridSearchImpl<EmbeddingIndexImpl, FtsIndexImpl, FactStoreImpl, GraphStoreImpl> {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        HybridSearchImpl::new(
            Arc::new(EmbeddingIndexImpl::new(pool.clone())),
            Arc::new(FtsIndexImpl::new(pool.clone())),
            Arc::new(FactStoreImpl::new(pool.clone())),
            Arc::new(GraphStoreImpl::new(pool.clone())),
            RetrievalConfig::default(),
        )
    }

    #[tokio::test]
    async fn text_only_search_finds_stored_fact() {
        let h = harness().await;
        let fact_id = h
            .facts
            .store(
                "proj",
                "the build uses rustc for compilation",
                FactType::Knowledge,
                &[],
                Confidence::Stated,
                None,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();

        let results = h
            .search(SearchQuery {
                query: "rustc".to_string(),
                query_embedding: None,
                top_k: 5,
                project: Some("proj".to_string()),
                as_of: None,
                graph_depth: 0,
            })
            .await
            .unwrap();

        assert!(results.iter().any(|r| r.fact.id == fact_id));
    }

    #[tokio::test]
    async fn vector_and_text_results_are_fused_and_deduped() {
        let h = harness().await;
        let fact_id = h
            .facts
            .store(
                "proj",
                "cortex uses sqlite for storage",
                FactType::Knowledge,
                &[],
                Confidence::Stated,
                None,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();
        h.embeddings.upsert(fact_id, &[1.0, 0.0, 0.0]).await.unwrap();

        let results = h
            .search(SearchQuery {
                query: "sqlite".to_string(),
                query_embedding: Some(vec![1.0, 0.0, 0.0]),
                top_k: 5,
                project: Some("proj".to_string()),
                as_of: None,
                graph_depth: 0,
            })
            .await
            .unwrap();

        assert_eq!(results.iter().filter(|r| r.fact.id == fact_id).count(), 1);
    }

    #[tokio::test]
    async fn fused_ranking_favors_query_term_matches() {
        let h = harness().await;
        for content in [
            "Python is great for ML",
            "Use pytest for testing Python",
            "Docker simplifies deployment",
        ] {
            h.facts
                .store(
                    "proj",
                    content,
                    FactType::Knowledge,
                    &[],
                    Confidence::Stated,
                    None,
                    serde_json::json!({}),
                    None,
                )
                .await
                .unwrap();
        }

        let results = h
            .search(SearchQuery {
                query: "Python".to_string(),
                query_embedding: None,
                top_k: 5,
                project: Some("proj".to_string()),
                as_of: None,
                graph_depth: 0,
            })
            .await
            .unwrap();

        assert!(!results.is_empty());
        assert!(results.iter().all(|r| r.fused_score > 0.0));
        let docker_rank = results.iter().position(|r| r.fact.content.contains("Docker"));
        let python_rank = results
            .iter()
            .position(|r| r.fact.content.contains("Python is great"));
        assert!(python_rank.is_some());
        if let Some(docker_rank) = docker_rank {
            assert!(python_rank.unwrap() < docker_rank);
        }
    }

    #[tokio::test]
    async fn no_results_is_empty_not_error() {
        let h = harness().await;
        let results = h
            .search(SearchQuery {
                query: "nonexistent".to_string(),
                query_embedding: None,
                top_k: 5,
                project: Some("proj".to_string()),
                as_of: None,
                graph_depth: 0,
            })
            .await
            .unwrap();
        assert!(results.is_empty());
    }
}
