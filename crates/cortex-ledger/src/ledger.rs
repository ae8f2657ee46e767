//! `ILedger` implementation: hash-chained transactions plus adaptive
//! Merkle checkpoints, grounded in the original project's
//! `ImmutableLedger`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use cortex_core::config::LedgerConfig;
use cortex_core::errors::CortexResult;
use cortex_core::hash::{canonical_string, compute_hash, verify_hash, GENESIS_HASH};
use cortex_core::models::{
    HashVersion, IntegrityReport, IntegrityViolation, MerkleCheckpoint, Transaction,
};
use cortex_core::traits::ILedger;
use cortex_storage::pool::Pool;
use cortex_storage::to_storage_err;

use crate::merkle::compute_root;
use crate::rate::WriteRateTracker;

pub struct LedgerImpl {
    pool: Arc<Pool>,
    config: LedgerConfig,
    rate: WriteRateTracker,
}

impl LedgerImpl {
    pub fn new(pool: Arc<Pool>, config: LedgerConfig) -> Self {
        let rate = WriteRateTracker::new(config.rate_window_capacity);
        Self { pool, config, rate }
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl ILedger for LedgerImpl {
    async fn append(&self, project: &str, action: &str, detail: serde_json::Value) -> CortexResult<i64> {
        let project = project.to_string();
        let action = action.to_string();
        let detail_json = canonical_string(&detail);
        let now = Utc::now();

        let tx_id = self
            .pool
            .with_writer(move |conn| {
                let prev_hash: String = conn
                    .query_row("SELECT hash FROM transactions ORDER BY id DESC LIMIT 1", [], |row| {
                        row.get(0)
                    })
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?
                    .unwrap_or_else(|| GENESIS_HASH.to_string());

                let ts = now.to_rfc3339();
                let hash = compute_hash(&prev_hash, &project, &action, &detail_json, &ts);

                conn.execute(
                    "INSERT INTO transactions (project, action, detail, timestamp, prev_hash, hash, hash_version)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'v2')",
                    params![project, action, detail_json, ts, prev_hash, hash],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(conn.last_insert_rowid())
            })
            .await?;

        self.rate.record();
        Ok(tx_id)
    }

    async fn create_checkpoint(&self) -> CortexResult<Option<MerkleCheckpoint>> {
        let batch_size = self.rate.adaptive_batch_size(&self.config) as i64;

        self.pool
            .with_writer(move |conn| {
                let last_tx: i64 = conn
                    .query_row("SELECT MAX(tx_end_id) FROM merkle_roots", [], |row| {
                        row.get::<_, Option<i64>>(0)
                    })
                    .map_err(|e| to_storage_err(e.to_string()))?
                    .unwrap_or(0);

                let pending: i64 = conn
                    .query_row(
                        "SELECT COUNT(*) FROM transactions WHERE id > ?1",
                        params![last_tx],
                        |row| row.get(0),
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;

                if pending < batch_size {
                    return Ok(None);
                }

                let start_id = last_tx + 1;
                let end_id: i64 = match conn
                    .query_row(
                        "SELECT id FROM transactions WHERE id >= ?1 ORDER BY id LIMIT 1 OFFSET ?2",
                        params![start_id, batch_size - 1],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?
                {
                    Some(id) => id,
                    None => return Ok(None),
                };

                let hashes = collect_hashes(conn, start_id, end_id)?;
                let Some(root_hash) = compute_root(&hashes) else {
                    return Ok(None);
                };

                let created_at = Utc::now();
                conn.execute(
                    "INSERT INTO merkle_roots (root_hash, tx_start_id, tx_end_id, tx_count, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![root_hash, start_id, end_id, hashes.len() as i64, created_at.to_rfc3339()],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;

                let id = conn.last_insert_rowid();
                tracing::info!(checkpoint_id = id, start_id, end_id, "created Merkle checkpoint");

                Ok(Some(MerkleCheckpoint {
                    id,
                    root_hash,
                    tx_start_id: start_id,
                    tx_end_id: end_id,
                    tx_count: hashes.len() as i64,
                    created_at,
                }))
            })
            .await
    }

    async fn verify_integrity(&self) -> CortexResult<IntegrityReport> {
        self.pool
            .with_writer(move |conn| {
                let mut violations = Vec::new();

                let mut stmt = conn
                    .prepare(
                        "SELECT id, prev_hash, hash, project, action, detail, timestamp
                         FROM transactions ORDER BY id",
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let rows = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                            row.get::<_, String>(5)?,
                            row.get::<_, String>(6)?,
                        ))
                    })
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let mut current_prev = GENESIS_HASH.to_string();
                let mut tx_checked = 0i64;
                for row in rows {
                    let (tx_id, prev_hash, hash, project, action, detail, ts) =
                        row.map_err(|e| to_storage_err(e.to_string()))?;
                    tx_checked += 1;

                    if prev_hash != current_prev {
                        violations.push(IntegrityViolation::ChainBreak { tx_id });
                    }
                    if !verify_hash(&hash, &prev_hash, &project, &action, &detail, &ts) {
                        violations.push(IntegrityViolation::HashMismatch { tx_id });
                    }
                    current_prev = hash;
                }

                let mut stmt = conn
                    .prepare("SELECT id, root_hash, tx_start_id, tx_end_id FROM merkle_roots ORDER BY id")
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let roots = stmt
                    .query_map([], |row| {
                        Ok((
                            row.get::<_, i64>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, i64>(2)?,
                            row.get::<_, i64>(3)?,
                        ))
                    })
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let mut roots_checked = 0i64;
                for row in roots {
                    let (checkpoint_id, root_hash, start, end) = row.map_err(|e| to_storage_err(e.to_string()))?;
                    roots_checked += 1;
                    let hashes = collect_hashes(conn, start, end)?;
                    if compute_root(&hashes).as_deref() != Some(root_hash.as_str()) {
                        violations.push(IntegrityViolation::MerkleMismatch { checkpoint_id });
                    }
                }

                let valid = violations.is_empty();
                let status = if valid { "ok" } else { "violation" };
                let details_json = serde_json::to_string(&violations)?;
                let now = Utc::now().to_rfc3339();
                conn.execute(
                    "INSERT INTO integrity_checks (check_type, status, details_json, started_at, completed_at)
                     VALUES ('full', ?1, ?2, ?3, ?3)",
                    params![status, details_json, now],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;

                Ok(IntegrityReport {
                    valid,
                    violations,
                    tx_checked,
                    roots_checked,
                })
            })
            .await
    }

    async fn get_transaction(&self, tx_id: i64) -> CortexResult<Option<Transaction>> {
        self.pool
            .with_reader(move |conn| {
                conn.query_row(
                    "SELECT id, project, action, detail, timestamp, prev_hash, hash, hash_version
                     FROM transactions WHERE id = ?1",
                    params![tx_id],
                    |row| {
                        let ts: String = row.get(4)?;
                        let hash_version: String = row.get(7)?;
                        Ok(Transaction {
                            id: row.get(0)?,
                            project: row.get(1)?,
                            action: row.get(2)?,
                            detail: row.get(3)?,
                            timestamp: parse_ts(&ts),
                            prev_hash: row.get(5)?,
                            hash: row.get(6)?,
                            hash_version: if hash_version == "v1" { HashVersion::V1 } else { HashVersion::V2 },
                        })
                    },
                )
                .optional()
                .map_err(|e| to_storage_err(e.to_string()))
            })
            .await
    }

    fn current_write_rate(&self) -> f64 {
        self.rate.rate(self.config.rate_window_secs)
    }
}

fn collect_hashes(conn: &rusqlite::Connection, start_id: i64, end_id: i64) -> CortexResult<Vec<String>> {
    let mut stmt = conn
        .prepare("SELECT hash FROM transactions WHERE id >= ?1 AND id <= ?2 ORDER BY id")
        .map_err(|e| to_storage_err(e.to_string()))?;
    let rows = stmt
        .query_map(params![start_id, end_id], |row| row.get::<_, String>(0))
        .map_err(|e| to_storage_err(e.to_string()))?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;

    fn ledger() -> LedgerImpl {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        LedgerImpl::new(pool, LedgerConfig::default())
    }

    #[tokio::test]
    async fn first_append_chains_from_genesis() {
        let l = ledger();
        let id = l.append("proj", "store", serde_json::json!({"fact_id": 1})).await.unwrap();
        let tx = l.get_transaction(id).await.unwrap().unwrap();
        assert_eq!(tx.prev_hash, GENESIS_HASH);
    }

    #[tokio::test]
    async fn second_append_chains_from_first_hash() {
        let l = ledger();
        let id1 = l.append("proj", "store", serde_json::json!({"fact_id": 1})).await.unwrap();
        let id2 = l.append("proj", "store", serde_json::json!({"fact_id": 2})).await.unwrap();
        let tx1 = l.get_transaction(id1).await.unwrap().unwrap();
        let tx2 = l.get_transaction(id2).await.unwrap().unwrap();
        assert_eq!(tx2.prev_hash, tx1.hash);
    }

    #[tokio::test]
    async fn verify_integrity_clean_chain_has_no_violations() {
        let l = ledger();
        for i in 0..5 {
            l.append("proj", "store", serde_json::json!({"fact_id": i})).await.unwrap();
        }
        let report = l.verify_integrity().await.unwrap();
        assert!(report.valid);
        assert_eq!(report.tx_checked, 5);
    }

    #[tokio::test]
    async fn checkpoint_is_none_below_batch_threshold() {
        let l = ledger();
        l.append("proj", "store", serde_json::json!({})).await.unwrap();
        let checkpoint = l.create_checkpoint().await.unwrap();
        assert!(checkpoint.is_none());
    }

    #[tokio::test]
    async fn checkpoint_forms_once_batch_threshold_met() {
        let mut config = LedgerConfig::default();
        config.checkpoint_max = 3;
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        let l = LedgerImpl::new(pool, config);
        for i in 0..3 {
            l.append("proj", "store", serde_json::json!({"fact_id": i})).await.unwrap();
        }
        let checkpoint = l.create_checkpoint().await.unwrap().unwrap();
        assert_eq!(checkpoint.tx_count, 3);

        let report = l.verify_integrity().await.unwrap();
        assert!(report.valid);
    }

    #[tokio::test]
    async fn tampered_hash_reports_mismatch_and_chain_break() {
        let l = ledger();
        let ids: Vec<i64> = {
            let mut out = Vec::new();
            for i in 0..3 {
                out.push(l.append("proj", "store", serde_json::json!({"fact_id": i})).await.unwrap());
            }
            out
        };
        let middle = ids[1];

        l.pool
            .with_writer(move |conn| {
                conn.execute(
                    "UPDATE transactions SET hash = 'tampered' WHERE id = ?1",
                    params![middle],
                )
                .map_err(|e| to_storage_err(e.to_string()))
            })
            .await
            .unwrap();

        let report = l.verify_integrity().await.unwrap();
        assert!(!report.valid);
        assert_eq!(report.tx_checked, 3);
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, IntegrityViolation::HashMismatch { tx_id } if *tx_id == middle)));
        assert!(report
            .violations
            .iter()
            .any(|v| matches!(v, IntegrityViolation::ChainBreak { tx_id } if *tx_id == ids[2])));
    }
}
