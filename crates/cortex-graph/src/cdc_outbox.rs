//! `ICdcOutbox` implementation over `graph_outbox`.
//!
//! Local reads/writes never depend on this queue draining; it only
//! carries mutations toward an optional remote graph backend.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use cortex_core::errors::CortexResult;
use cortex_core::models::{GraphOutboxEntry, OutboxStatus};
use cortex_core::traits::ICdcOutbox;
use cortex_storage::pool::Pool;
use cortex_storage::to_storage_err;

pub struct CdcOutboxImpl {
    pool: Arc<Pool>,
}

impl CdcOutboxImpl {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn status_from_str(s: &str) -> OutboxStatus {
    match s {
        "processed" => OutboxStatus::Processed,
        "failed" => OutboxStatus::Failed,
        _ => OutboxStatus::Pending,
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<GraphOutboxEntry> {
    let status: String = row.get(3)?;
    let processed_at: Option<String> = row.get(5)?;
    let created_at: String = row.get(6)?;
    Ok(GraphOutboxEntry {
        id: row.get(0)?,
        fact_id: row.get(1)?,
        action: row.get(2)?,
        status: status_from_str(&status),
        retry_count: row.get(4)?,
        processed_at: processed_at.map(|s| parse_ts(&s)),
        created_at: parse_ts(&created_at),
    })
}

const ENTRY_COLUMNS: &str = "id, fact_id, action, status, retry_count, processed_at, created_at";

impl ICdcOutbox for CdcOutboxImpl {
    async fn enqueue(&self, fact_id: i64, action: &str) -> CortexResult<i64> {
        let action = action.to_string();
        let now = Utc::now().to_rfc3339();

        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "INSERT INTO graph_outbox (fact_id, action, status, retry_count, created_at)
                     VALUES (?1, ?2, 'pending', 0, ?3)",
                    params![fact_id, action, now],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(conn.last_insert_rowid())
            })
            .await
    }

    async fn lease_pending(&self, limit: usize) -> CortexResult<Vec<GraphOutboxEntry>> {
        let limit = limit as i64;

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {ENTRY_COLUMNS} FROM graph_outbox
                     WHERE status = 'pending' ORDER BY id ASC LIMIT ?1"
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let rows = stmt
                    .query_map(params![limit], entry_from_row)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let mut out = Vec::new();
                for row in rows {
                    out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }
                Ok(out)
            })
            .await
    }

    async fn mark_processed(&self, entry_id: i64) -> CortexResult<()> {
        let now = Utc::now().to_rfc3339();
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "UPDATE graph_outbox SET status = 'processed', processed_at = ?2 WHERE id = ?1",
                    params![entry_id, now],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }

    async fn mark_failed(&self, entry_id: i64) -> CortexResult<()> {
        self.pool
            .with_writer(move |conn| {
                let row: Option<(String, i64)> = conn
                    .query_row(
                        "SELECT status, retry_count FROM graph_outbox WHERE id = ?1",
                        params![entry_id],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let Some((_, retry_count)) = row else { return Ok(()) };

                conn.execute(
                    "UPDATE graph_outbox SET status = 'failed', retry_count = ?2 WHERE id = ?1",
                    params![entry_id, retry_count + 1],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }

    async fn pending_count(&self) -> CortexResult<i64> {
        self.pool
            .with_reader(move |conn| {
                conn.query_row("SELECT COUNT(*) FROM graph_outbox WHERE status = 'pending'", [], |row| {
                    row.get(0)
                })
                .map_err(|e| to_storage_err(e.to_string()))
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;

    fn outbox() -> CdcOutboxImpl {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        CdcOutboxImpl::new(pool)
    }

    #[tokio::test]
    async fn enqueue_then_lease_returns_pending_entry() {
        let o = outbox();
        o.enqueue(1, "upsert").await.unwrap();
        let leased = o.lease_pending(10).await.unwrap();
        assert_eq!(leased.len(), 1);
        assert_eq!(leased[0].status, OutboxStatus::Pending);
    }

    #[tokio::test]
    async fn mark_processed_removes_from_pending_count() {
        let o = outbox();
        let id = o.enqueue(1, "upsert").await.unwrap();
        o.mark_processed(id).await.unwrap();
        assert_eq!(o.pending_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn mark_failed_increments_retry_count() {
        let o = outbox();
        let id = o.enqueue(1, "upsert").await.unwrap();
        o.mark_failed(id).await.unwrap();
        let leased = o.lease_pending(10).await.unwrap();
        assert!(leased.is_empty());
    }
}
