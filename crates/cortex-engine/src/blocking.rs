//! `BlockingCortex`: a synchronous facade over the same connection pool
//! the async `CortexEngine` uses, for embedded/CLI-style callers that
//! have no Tokio runtime to drive `spawn_blocking`, grounded in
//! `pool.rs`'s own `with_writer_blocking`/`with_reader_blocking` pair.
//!
//! This is a narrower surface than [`crate::CortexEngine`] — the
//! write-path orchestration (embedding, graph extraction, ledger
//! append, outbox enqueue) that makes `store` more than an INSERT stays
//! on the async engine; `BlockingCortex` covers the operations a CLI
//! needs without an executor: direct fact CRUD, ledger append/read, and
//! stats.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use cortex_core::config::StorageConfig;
use cortex_core::errors::{CortexResult, StorageError};
use cortex_core::hash::{canonical_string, compute_hash, GENESIS_HASH};
use cortex_core::models::{meta_keys, Confidence, Fact, FactType};
use cortex_core::validation::validate_store;
use cortex_storage::queries::rows::{fact_from_row, FACT_COLUMNS};
use cortex_storage::pool::Pool;

/// Synchronous entry point. Holds its own pool instance — open a second
/// one over the same file if an async `CortexEngine` is also live; SQLite's
/// WAL mode makes that safe across processes or runtimes.
pub struct BlockingCortex {
    pool: Arc<Pool>,
    config: cortex_core::config::CortexConfig,
}

impl BlockingCortex {
    pub fn open(path: &Path, config: cortex_core::config::CortexConfig) -> CortexResult<Self> {
        let pool = Arc::new(Pool::open(path, &config.storage)?);
        Ok(Self { pool, config })
    }

    pub fn open_in_memory(config: cortex_core::config::CortexConfig) -> CortexResult<Self> {
        let pool = Arc::new(Pool::open_in_memory(&config.storage)?);
        Ok(Self { pool, config })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn store(
        &self,
        project: &str,
        content: &str,
        fact_type: FactType,
        tags: &[String],
        confidence: Confidence,
        source: Option<&str>,
        meta: serde_json::Value,
    ) -> CortexResult<i64> {
        validate_store(&self.config.safety, project, content, tags)?;

        let project = project.to_string();
        let content = content.to_string();
        let tags_json = serde_json::to_string(tags)?;
        let meta_json = serde_json::to_string(&meta)?;
        let source = source.map(|s| s.to_string());
        let now = Utc::now();

        let fact_id = self.pool.with_writer_blocking(move |conn| {
            conn.execute(
                "INSERT INTO facts (
                    project, fact_type, content, tags, source, meta, confidence,
                    consensus_score, valid_from, valid_until, created_at, updated_at, tx_id
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1.0, ?8, NULL, ?8, ?8, NULL)",
                params![
                    project,
                    fact_type.as_str(),
                    content,
                    tags_json,
                    source,
                    meta_json,
                    confidence.as_str(),
                    now.to_rfc3339(),
                ],
            )
            .map_err(|e| StorageError::Sqlite(e.to_string()))?;
            Ok(conn.last_insert_rowid())
        })?;

        self.append_ledger_blocking(
            "store",
            serde_json::json!({ "fact_id": fact_id, "project": project, "content": content }),
        )?;
        Ok(fact_id)
    }

    pub fn get(&self, fact_id: i64) -> CortexResult<Option<Fact>> {
        self.pool.with_reader_blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1"),
                params![fact_id],
                fact_from_row,
            )
            .optional()
            .map_err(|e| StorageError::Sqlite(e.to_string()).into())
        })
    }

    pub fn recall(&self, project: &str, limit: Option<usize>) -> CortexResult<Vec<Fact>> {
        let project = project.to_string();
        let limit = limit.unwrap_or(50) as i64;

        let mut facts = self.pool.with_reader_blocking(move |conn| {
            let sql = format!(
                "SELECT {FACT_COLUMNS} FROM facts WHERE project = ?1 AND valid_until IS NULL \
                 ORDER BY created_at DESC LIMIT ?2"
            );
            let mut stmt = conn.prepare(&sql).map_err(|e| StorageError::Sqlite(e.to_string()))?;
            let rows = stmt
                .query_map(params![project, limit], fact_from_row)
                .map_err(|e| StorageError::Sqlite(e.to_string()))?;
            let mut out = Vec::new();
            for row in rows {
                out.push(row.map_err(|e| StorageError::Sqlite(e.to_string()))?);
            }
            Ok(out)
        })?;

        let now = Utc::now();
        facts.sort_by(|a, b| b.recall_rank(now).partial_cmp(&a.recall_rank(now)).unwrap());
        Ok(facts)
    }

    pub fn deprecate(&self, fact_id: i64, reason: Option<&str>) -> CortexResult<bool> {
        let reason = reason.map(|s| s.to_string());
        let now = Utc::now();

        let deprecated = self.pool.with_writer_blocking(move |conn| {
            let existing = conn
                .query_row(
                    &format!("SELECT {FACT_COLUMNS} FROM facts WHERE id = ?1"),
                    params![fact_id],
                    fact_from_row,
                )
                .optional()
                .map_err(|e| StorageError::Sqlite(e.to_string()))?;

            let Some(existing) = existing else { return Ok(false) };
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
            let meta_json = serde_json::to_string(&meta).map_err(|e| StorageError::Sqlite(e.to_string()))?;

            conn.execute(
                "UPDATE facts SET valid_until = ?2, confidence = 'deprecated', meta = ?3, updated_at = ?2
                 WHERE id = ?1",
                params![fact_id, now.to_rfc3339(), meta_json],
            )
            .map_err(|e| StorageError::Sqlite(e.to_string()))?;
            Ok(true)
        })?;

        if deprecated {
            self.append_ledger_blocking("deprecate", serde_json::json!({ "fact_id": fact_id, "reason": reason }))?;
        }
        Ok(deprecated)
    }

    pub fn verify_ledger_chain_head(&self) -> CortexResult<Option<String>> {
        self.pool.with_reader_blocking(|conn| {
            conn.query_row("SELECT hash FROM transactions ORDER BY id DESC LIMIT 1", [], |row| row.get(0))
                .optional()
                .map_err(|e| StorageError::Sqlite(e.to_string()).into())
        })
    }

    pub fn fact_count(&self, project: &str) -> CortexResult<i64> {
        let project = project.to_string();
        self.pool.with_reader_blocking(move |conn| {
            conn.query_row("SELECT COUNT(*) FROM facts WHERE project = ?1", params![project], |row| row.get(0))
                .map_err(|e| StorageError::Sqlite(e.to_string()).into())
        })
    }

    fn append_ledger_blocking(&self, action: &str, detail: serde_json::Value) -> CortexResult<i64> {
        let action = action.to_string();
        let detail_json = canonical_string(&detail);
        let now = Utc::now();

        self.pool.with_writer_blocking(move |conn| {
            let prev_hash: String = conn
                .query_row("SELECT hash FROM transactions ORDER BY id DESC LIMIT 1", [], |row| row.get(0))
                .optional()
                .map_err(|e| StorageError::Sqlite(e.to_string()))?
                .unwrap_or_else(|| GENESIS_HASH.to_string());

            let ts = now.to_rfc3339();
            let hash = compute_hash(&prev_hash, "_blocking", &action, &detail_json, &ts);

            conn.execute(
                "INSERT INTO transactions (project, action, detail, timestamp, prev_hash, hash, hash_version)
                 VALUES ('_blocking', ?1, ?2, ?3, ?4, ?5, 'v2')",
                params![action, detail_json, ts, prev_hash, hash],
            )
            .map_err(|e| StorageError::Sqlite(e.to_string()))?;
            Ok(conn.last_insert_rowid())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::CortexConfig;

    fn cortex() -> BlockingCortex {
        BlockingCortex::open_in_memory(CortexConfig::default()).unwrap()
    }

    #[test]
    fn store_then_get_roundtrips_without_a_runtime() {
        let c = cortex();
        let id = c
            .store("proj", "blocking facade works", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}))
            .unwrap();
        let fact = c.get(id).unwrap().unwrap();
        assert_eq!(fact.content, "blocking facade works");
    }

    #[test]
    fn deprecate_marks_fact_inactive() {
        let c = cortex();
        let id = c
            .store("proj", "temporary", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({}))
            .unwrap();
        assert!(c.deprecate(id, Some("superseded")).unwrap());
        let fact = c.get(id).unwrap().unwrap();
        assert!(!fact.is_active());
    }

    #[test]
    fn recall_orders_by_recall_rank() {
        let c = cortex();
        c.store("proj", "alpha", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({})).unwrap();
        c.store("proj", "beta", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({})).unwrap();
        let recalled = c.recall("proj", None).unwrap();
        assert_eq!(recalled.len(), 2);
    }

    #[test]
    fn ledger_chain_head_advances_on_store() {
        let c = cortex();
        assert!(c.verify_ledger_chain_head().unwrap().is_none());
        c.store("proj", "fact", FactType::Knowledge, &[], Confidence::Stated, None, serde_json::json!({})).unwrap();
        assert!(c.verify_ledger_chain_head().unwrap().is_some());
    }
}
