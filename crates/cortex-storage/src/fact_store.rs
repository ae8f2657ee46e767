//! `IFactStore` implementation: the `facts` table, ghosts, and consensus
//! voting.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use cortex_core::errors::{CortexError, CortexResult, StorageError};
use cortex_core::models::{meta_keys, Confidence, Fact, FactType, Ghost, GhostStatus};
use cortex_core::traits::IFactStore;

use crate::pool::Pool;
use crate::queries::rows::{fact_from_row, ghost_from_row, FACT_COLUMNS, GHOST_COLUMNS};
use crate::to_storage_err;

pub struct FactStoreImpl {
    pool: std::sync::Arc<Pool>,
}

impl FactStoreImpl {
    pub fn new(pool: std::sync::Arc<Pool>) -> Self {
        Self { pool }
    }
}

impl IFactStore for FactStoreImpl {
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
    ) -> CortexResult<i64> {
        let project = project.to_string();
        let content = content.to_string();
        let tags_json = serde_json::to_string(tags)?;
        let meta_json = serde_json::to_string(&meta)?;
        let source = source.map(|s| s.to_string());
        let now = Utc::now();
        let valid_from = valid_from.unwrap_or(now);

        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO facts (
                        project, fact_type, content, tags, source, meta, confidence,
                        consensus_score, valid_from, valid_until, created_at, updated_at, tx_id
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1.0, ?8, NULL, ?9, ?9, NULL)",
                    params![
                        project,
                        fact_type.as_str(),
                        content,
                        tags_json,
                        source,
                        meta_json,
                        confidence.as_str(),
                        valid_from.to_rfc3339(),
                        now.to_rfc3339(),
                    ],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn update(
        &self,
        fact_id: i64,
        content: Option<&str>,
        tags: Option<&[String]>,
        meta: Option<serde_json::Value>,
    ) -> CortexResult<i64> {
        let existing = self
            .get(fact_id)
            .await?
            .ok_or_else(|| CortexError::from(StorageError::FactNotFound { id: fact_id }))?;

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
                meta_keys::PREVIOUS_FACT_ID.to_string(),
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

    async fn deprecate(&self, fact_id: i64, reason: Option<&str>) -> CortexResult<bool> {
        let reason = reason.map(|s| s.to_string());
        let now = Utc::now();

        self.pool
            .with_writer(move |conn| {
                let existing = conn
                    .query_row(
                        &format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1"),
                        params![fact_id],
                        fact_from_row,
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let Some(existing) = existing else {
                    return Ok(false);
                };
                if !existing.is_active() {
                    return Ok(false);
                }

                let mut meta = existing.meta.clone();
                if let Some(reason) = &reason {
                    meta.insert(
                        meta_keys::DEPRECATION_REASON.to_string(),
                        serde_json::Value::String(reason.clone()),
                    );
                }
                let meta_json = serde_json::to_string(&meta)?;

                conn.execute(
                    "UPDATE facts SET valid_until = ?2, confidence = 'deprecated', meta = ?3, updated_at = ?2
                     WHERE id = ?1",
                    params![fact_id, now.to_rfc3339(), meta_json],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(true)
            })
            .await
    }

    async fn set_tx_id(&self, fact_id: i64, tx_id: i64) -> CortexResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "UPDATE facts SET tx_id = ?2 WHERE id = ?1",
                    params![fact_id, tx_id],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }

    async fn get(&self, fact_id: i64) -> CortexResult<Option<Fact>> {
        self.pool
            .with_reader(move |conn| {
                conn.query_row(
                    &format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1"),
                    params![fact_id],
                    fact_from_row,
                )
                .optional()
                .map_err(|e| to_storage_err(e.to_string()))
            })
            .await
    }

    async fn recall(
        &self,
        project: &str,
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> CortexResult<Vec<Fact>> {
        let project = project.to_string();
        let limit = limit.unwrap_or(50);
        let offset = offset.unwrap_or(0);

        let mut facts = self
            .pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {FACT_COLUMNS} FROM facts WHERE project = ?1 AND valid_until IS NULL"
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let rows = stmt
                    .query_map(params![project], fact_from_row)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }
                Ok(out)
            })
            .await?;

        // Rank the *entire* active set before paginating -- slicing by
        // offset/limit first would drop high-ranked facts that fall outside
        // the most-recently-created page.
        let now = Utc::now();
        facts.sort_by(|a, b| {
            b.recall_rank(now)
                .partial_cmp(&a.recall_rank(now))
                .unwrap()
                .then_with(|| a.fact_type.cmp(&b.fact_type))
                .then_with(|| b.created_at.cmp(&a.created_at))
        });

        Ok(facts.into_iter().skip(offset).take(limit).collect())
    }

    async fn history(&self, project: &str, as_of: Option<DateTime<Utc>>) -> CortexResult<Vec<Fact>> {
        let project = project.to_string();
        self.pool
            .with_reader(move |conn| {
                let sql = match as_of {
                    Some(_) => format!(
                        "SELECT {FACT_COLUMNS} FROM facts WHERE project = ?1 \
                         AND valid_from <= ?2 AND (valid_until IS NULL OR valid_until > ?2) \
                         ORDER BY created_at ASC"
                    ),
                    None => format!("SELECT {FACT_COLUMNS} FROM facts WHERE project = ?1 ORDER BY created_at ASC"),
                };
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                let rows = if let Some(ts) = as_of {
                    stmt.query_map(params![project, ts.to_rfc3339()], fact_from_row)
                } else {
                    stmt.query_map(params![project], fact_from_row)
                }
                .map_err(|e| to_storage_err(e.to_string()))?;
                for row in rows {
                    out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }
                Ok(out)
            })
            .await
    }

    async fn reconstruct_state(
        &self,
        target_tx_id: i64,
        project: Option<&str>,
    ) -> CortexResult<Vec<Fact>> {
        let project = project.map(|p| p.to_string());
        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {FACT_COLUMNS} FROM facts
                     WHERE tx_id <= ?1
                       AND (valid_until IS NULL OR valid_until > (SELECT timestamp FROM transactions WHERE id = ?1))
                       {}
                     ORDER BY created_at ASC",
                    if project.is_some() { "AND project = ?2" } else { "" }
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                let rows = if let Some(p) = &project {
                    stmt.query_map(params![target_tx_id, p], fact_from_row)
                } else {
                    stmt.query_map(params![target_tx_id], fact_from_row)
                }
                .map_err(|e| to_storage_err(e.to_string()))?;
                for row in rows {
                    out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }
                Ok(out)
            })
            .await
    }

    async fn register_ghost(&self, reference: &str, context: &str, project: &str) -> CortexResult<i64> {
        let reference = reference.to_string();
        let context = context.to_string();
        let project = project.to_string();
        let now = Utc::now();

        self.pool
            .with_writer(move |conn| {
                let existing: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM ghosts WHERE reference = ?1 AND project = ?2 AND status = 'open'",
                        params![reference, project],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                if let Some(id) = existing {
                    return Ok(id);
                }

                conn.execute(
                    "INSERT INTO ghosts (reference, context, project, status, target_entity, confidence, created_at)
                     VALUES (?1, ?2, ?3, 'open', NULL, NULL, ?4)",
                    params![reference, context, project, now.to_rfc3339()],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn resolve_ghost(
        &self,
        ghost_id: i64,
        target_entity: Option<&str>,
        confidence: Option<f64>,
    ) -> CortexResult<()> {
        let target_entity = target_entity.map(|s| s.to_string());
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "UPDATE ghosts SET status = 'resolved', target_entity = ?2, confidence = ?3 WHERE id = ?1",
                    params![ghost_id, target_entity, confidence],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }

    async fn get_ghost(&self, ghost_id: i64) -> CortexResult<Option<Ghost>> {
        self.pool
            .with_reader(move |conn| {
                conn.query_row(
                    &format!("SELECT {GHOST_COLUMNS} FROM ghosts WHERE id = ?1"),
                    params![ghost_id],
                    ghost_from_row,
                )
                .optional()
                .map_err(|e| to_storage_err(e.to_string()))
            })
            .await
    }

    async fn list_ghosts(&self, project: &str, status: Option<GhostStatus>) -> CortexResult<Vec<Ghost>> {
        let project = project.to_string();
        let status_str = status.map(|s| match s {
            GhostStatus::Open => "open",
            GhostStatus::Resolved => "resolved",
        });

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {GHOST_COLUMNS} FROM ghosts WHERE project = ?1 {} ORDER BY created_at DESC",
                    if status_str.is_some() { "AND status = ?2" } else { "" }
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                let rows = if let Some(s) = status_str {
                    stmt.query_map(params![project, s], ghost_from_row)
                } else {
                    stmt.query_map(params![project], ghost_from_row)
                }
                .map_err(|e| to_storage_err(e.to_string()))?;
                for row in rows {
                    out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }
                Ok(out)
            })
            .await
    }

    async fn vote(
        &self,
        fact_id: i64,
        agent_id: &str,
        value: i8,
        weight: f64,
        reputation_at_vote: f64,
    ) -> CortexResult<f64> {
        let agent_id = agent_id.to_string();
        let now = Utc::now();

        self.pool
            .with_writer(move |conn| {
                if value == 0 {
                    conn.execute(
                        "DELETE FROM consensus_votes_v2 WHERE fact_id = ?1 AND agent_id = ?2",
                        params![fact_id, agent_id],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                } else {
                    conn.execute(
                        "INSERT INTO consensus_votes_v2
                            (fact_id, agent_id, value, weight, reputation_at_vote, created_at)
                         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                         ON CONFLICT(fact_id, agent_id) DO UPDATE SET
                            value = excluded.value,
                            weight = excluded.weight,
                            reputation_at_vote = excluded.reputation_at_vote,
                            created_at = excluded.created_at",
                        params![fact_id, agent_id, value as i64, weight, reputation_at_vote, now.to_rfc3339()],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                }

                recalculate_consensus(conn, fact_id)
            })
            .await
    }
}

/// Reputation-weighted average over every live vote for `fact_id`
/// (grounded in the original project's `vote_v2`/`_recalculate_consensus_v2`):
/// `score = 1 + weighted_sum / total_weight`, where each vote's effective
/// weight is `max(weight, reputation_at_vote)`. Recomputed from scratch on
/// every call, not accumulated incrementally.
fn recalculate_consensus(conn: &rusqlite::Connection, fact_id: i64) -> CortexResult<f64> {
    let mut stmt = conn
        .prepare("SELECT value, weight, reputation_at_vote FROM consensus_votes_v2 WHERE fact_id = ?1")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![fact_id], |row| {
            let value: i64 = row.get(0)?;
            let weight: f64 = row.get(1)?;
            let reputation: f64 = row.get(2)?;
            Ok((value as f64, weight.max(reputation)))
        })
        .map_err(|e| to_storage_err(e.to_string()))?;

    let mut weighted_sum = 0.0;
    let mut total_weight = 0.0;
    for row in rows {
        let (value, effective_weight) = row.map_err(|e| to_storage_err(e.to_string()))?;
        weighted_sum += value * effective_weight;
        total_weight += effective_weight;
    }

    let score = if total_weight > 0.0 {
        1.0 + weighted_sum / total_weight
    } else {
        1.0
    };

    let confidence = if score >= 1.5 {
        Some(Confidence::Verified)
    } else if score <= 0.5 {
        Some(Confidence::Disputed)
    } else {
        None
    };

    match confidence {
        Some(conf) => conn.execute(
            "UPDATE facts SET consensus_score = ?2, confidence = ?3 WHERE id = ?1",
            params![fact_id, score, conf.as_str()],
        ),
        None => conn.execute(
            "UPDATE facts SET consensus_score = ?2 WHERE id = ?1",
            params![fact_id, score],
        ),
    }
    .map_err(|e| to_storage_err(e.to_string()))?;

    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;
    use cortex_core::models::FactType;
    use std::sync::Arc;

    fn store() -> FactStoreImpl {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        FactStoreImpl::new(pool)
    }

    #[tokio::test]
    async fn store_then_get_round_trips() {
        let store = store();
        let id = store
            .store(
                "proj",
                "hello world",
                FactType::Knowledge,
                &["a".to_string()],
                Confidence::Stated,
                None,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();
        let fact = store.get(id).await.unwrap().unwrap();
        assert_eq!(fact.content, "hello world");
        assert!(fact.is_active());
    }

    #[tokio::test]
    async fn deprecate_is_idempotent_on_already_deprecated() {
        let store = store();
        let id = store
            .store(
                "proj",
                "x",
                FactType::Knowledge,
                &[],
                Confidence::Stated,
                None,
                serde_json::json!({}),
                None,
            )
            .await
            .unwrap();
        assert!(store.deprecate(id, Some("superseded")).await.unwrap());
        assert!(!store.deprecate(id, None).await.unwrap());
    }

    #[tokio::test]
    async fn vote_below_threshold_marks_disputed() {
        let store = store();
        let id = store
            .store("proj", "x", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let score = store.vote(id, "agent-a", -1, 1.0, 1.0).await.unwrap();
        assert!(score <= 0.5);
        let fact = store.get(id).await.unwrap().unwrap();
        assert_eq!(fact.confidence, Confidence::Disputed);
    }

    #[tokio::test]
    async fn vote_above_threshold_marks_verified() {
        let store = store();
        let id = store
            .store("proj", "x", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let score = store.vote(id, "agent-a", 1, 1.0, 1.0).await.unwrap();
        assert!(score >= 1.5);
        let fact = store.get(id).await.unwrap().unwrap();
        assert_eq!(fact.confidence, Confidence::Verified);
    }

    async fn insert_tx(pool: &Pool, ts: DateTime<Utc>) -> i64 {
        pool.with_writer(move |conn| {
            conn.execute(
                "INSERT INTO transactions (project, action, detail, timestamp, prev_hash, hash)
                 VALUES ('p', 'store', '{}', ?1, 'GENESIS', 'deadbeef')",
                params![ts.to_rfc3339()],
            )
            .map_err(|e| to_storage_err(e.to_string()))?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn reconstruct_state_matches_transaction_point_in_time() {
        let pool = std::sync::Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        let store = FactStoreImpl::new(pool.clone());

        let tx_a = insert_tx(&pool, Utc::now()).await;
        let a = store
            .store("X", "fact A", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        store.set_tx_id(a, tx_a).await.unwrap();

        let tx_b = insert_tx(&pool, Utc::now()).await;
        let b = store
            .store("X", "fact B", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        store.set_tx_id(b, tx_b).await.unwrap();

        let tx_c = insert_tx(&pool, Utc::now()).await;
        let c = store
            .store("X", "fact C", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        store.set_tx_id(c, tx_c).await.unwrap();

        // deprecate(A) happens at tx_d; reconstruct_state(tx_b) must still see A and B.
        let at_b = store.reconstruct_state(tx_b, Some("X")).await.unwrap();
        let ids_at_b: Vec<i64> = at_b.iter().map(|f| f.id).collect();
        assert!(ids_at_b.contains(&a));
        assert!(ids_at_b.contains(&b));
        assert!(!ids_at_b.contains(&c));

        // The engine's deprecate() sets valid_until first, then appends the ledger
        // transaction, so the transaction's own timestamp is always >= valid_until.
        // deprecate() never touches tx_id -- that column always names the fact's
        // *creating* transaction, so A's tx_id stays tx_a.
        store.deprecate(a, Some("outdated")).await.unwrap();
        let tx_d = insert_tx(&pool, Utc::now()).await;
        let at_d = store.reconstruct_state(tx_d, Some("X")).await.unwrap();
        let ids_at_d: Vec<i64> = at_d.iter().map(|f| f.id).collect();
        assert!(!ids_at_d.contains(&a));
        assert!(ids_at_d.contains(&b));
        assert!(ids_at_d.contains(&c));
    }

    #[tokio::test]
    async fn history_includes_deprecated_revisions_with_non_null_valid_until() {
        let store = store();
        let id = store
            .store("alpha", "Python supports async/await", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        store.deprecate(id, Some("outdated")).await.unwrap();

        let recalled = store.recall("alpha", None, None).await.unwrap();
        assert!(!recalled.iter().any(|f| f.id == id));

        let history = store.history("alpha", None).await.unwrap();
        let revision = history.iter().find(|f| f.id == id).unwrap();
        assert!(revision.valid_until.is_some());
    }

    #[tokio::test]
    async fn register_ghost_is_idempotent_on_reference_and_project() {
        let store = store();
        let first = store.register_ghost("some-ref", "ctx", "p").await.unwrap();
        let second = store.register_ghost("some-ref", "ctx2", "p").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn register_ghost_reopens_a_new_row_once_the_first_is_resolved() {
        let store = store();
        let first = store.register_ghost("some-ref", "ctx", "p").await.unwrap();
        store.resolve_ghost(first, Some("entity"), Some(0.9)).await.unwrap();
        let second = store.register_ghost("some-ref", "ctx2", "p").await.unwrap();
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn update_supersedes_instead_of_mutating_in_place() {
        let store = store();
        let id = store
            .store("proj", "v1", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();

        let new_id = store.update(id, Some("v2"), None, None).await.unwrap();
        assert_ne!(new_id, id);

        let original = store.get(id).await.unwrap().unwrap();
        assert_eq!(original.content, "v1");
        assert!(!original.is_active());

        let superseded = store.get(new_id).await.unwrap().unwrap();
        assert_eq!(superseded.content, "v2");
        assert!(superseded.is_active());
        assert_eq!(
            superseded.meta.get(cortex_core::models::meta_keys::PREVIOUS_FACT_ID),
            Some(&serde_json::json!(id))
        );
    }

    #[tokio::test]
    async fn recall_ranks_before_paginating() {
        let store = store();
        // Oldest-created, but will carry the highest consensus score -- a
        // SQL-side LIMIT ordered by created_at would drop it from a 1-row page.
        let low_id = store
            .store("proj", "low rank but newest", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        let high_id = store
            .store("proj", "high rank but oldest", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}), None)
            .await
            .unwrap();
        store.vote(high_id, "agent-a", 1, 1.0, 1.0).await.unwrap();

        let page = store.recall("proj", Some(1), None).await.unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, high_id);

        let rest = store.recall("proj", Some(1), Some(1)).await.unwrap();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].id, low_id);
    }
}
