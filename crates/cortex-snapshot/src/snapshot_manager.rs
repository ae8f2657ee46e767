//! `ISnapshotManager` implementation: `VACUUM INTO` physical backups with
//! a JSON metadata sidecar, grounded in the original
//! project's `engine/snapshots.py`.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use cortex_core::errors::{CortexError, CortexResult, SnapshotError};
use cortex_core::models::SnapshotInfo;
use cortex_core::traits::ISnapshotManager;
use cortex_storage::pool::Pool;
use cortex_storage::to_storage_err;

pub struct SnapshotManagerImpl {
    pool: Arc<Pool>,
    snapshot_dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct SnapshotSidecar {
    name: String,
    tx_id: i64,
    merkle_root: Option<String>,
    created_at: chrono::DateTime<Utc>,
    size_mb: f64,
    path: String,
}

impl From<SnapshotSidecar> for SnapshotInfo {
    fn from(s: SnapshotSidecar) -> Self {
        SnapshotInfo {
            name: s.name,
            tx_id: s.tx_id,
            merkle_root: s.merkle_root,
            created_at: s.created_at,
            size_mb: s.size_mb,
            path: s.path,
        }
    }
}

impl SnapshotManagerImpl {
    pub fn new(pool: Arc<Pool>) -> CortexResult<Self> {
        let snapshot_dir = pool
            .path()
            .parent()
            .map(|p| p.join("snapshots"))
            .unwrap_or_else(|| PathBuf::from("snapshots"));
        fs::create_dir_all(&snapshot_dir)
            .map_err(|e| CortexError::from(SnapshotError::BackupFailed(e.to_string())))?;
        Ok(Self { pool, snapshot_dir })
    }

    async fn latest_checkpoint(&self) -> CortexResult<(i64, Option<String>)> {
        self.pool
            .with_reader(move |conn| {
                let tx_id: i64 = conn
                    .query_row("SELECT MAX(id) FROM transactions", [], |row| row.get::<_, Option<i64>>(0))
                    .map_err(|e| to_storage_err(e.to_string()))?
                    .unwrap_or(0);
                let merkle_root: Option<String> = conn
                    .query_row(
                        "SELECT root_hash FROM merkle_roots ORDER BY id DESC LIMIT 1",
                        [],
                        |row| row.get(0),
                    )
                    .map_err(|e| to_storage_err(e.to_string()))
                    .or_else(|_| Ok(None))?;
                Ok((tx_id, merkle_root))
            })
            .await
    }
}

impl ISnapshotManager for SnapshotManagerImpl {
    async fn create_snapshot(&self, name: &str) -> CortexResult<SnapshotInfo> {
        let (tx_id, merkle_root) = self.latest_checkpoint().await?;

        let ts = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("cortex_snap_{ts}_{name}.db");
        let dest_path = self.snapshot_dir.join(&filename);
        let dest_sql_path = dest_path.to_string_lossy().replace('\'', "''");

        self.pool
            .with_writer(move |conn| {
                conn.execute(&format!("VACUUM INTO '{dest_sql_path}'"), [])
                    .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await?;

        let size_mb = fs::metadata(&dest_path)
            .map(|m| (m.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0)
            .map_err(|e| CortexError::from(SnapshotError::BackupFailed(e.to_string())))?;

        let created_at = Utc::now();
        let info = SnapshotSidecar {
            name: name.to_string(),
            tx_id,
            merkle_root,
            created_at,
            size_mb,
            path: dest_path.to_string_lossy().to_string(),
        };

        let meta_path = dest_path.with_extension("json");
        let json = serde_json::to_string_pretty(&info)?;
        fs::write(&meta_path, json).map_err(|e| CortexError::from(SnapshotError::BackupFailed(e.to_string())))?;

        tracing::info!(name, tx_id, path = %dest_path.display(), "snapshot created");
        Ok(info.into())
    }

    async fn list_snapshots(&self) -> CortexResult<Vec<SnapshotInfo>> {
        let mut snapshots = Vec::new();
        let entries = fs::read_dir(&self.snapshot_dir)
            .map_err(|e| CortexError::from(SnapshotError::BackupFailed(e.to_string())))?;

        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Ok(contents) = fs::read_to_string(&path) else { continue };
            let Ok(sidecar) = serde_json::from_str::<SnapshotSidecar>(&contents) else { continue };
            if std::path::Path::new(&sidecar.path).exists() {
                snapshots.push(sidecar.into());
            }
        }

        snapshots.sort_by(|a: &SnapshotInfo, b: &SnapshotInfo| b.created_at.cmp(&a.created_at));
        Ok(snapshots)
    }

    async fn restore_snapshot(&self, name: &str) -> CortexResult<()> {
        let snapshots = self.list_snapshots().await?;
        let Some(snap) = snapshots.iter().find(|s| s.name == name) else {
            return Err(CortexError::from(SnapshotError::NotFound { name: name.to_string() }));
        };

        let db_path = self.pool.path().to_path_buf();
        let backup_path = db_path.with_extension("db.bak");
        let snap_path = PathBuf::from(&snap.path);

        fs::copy(&db_path, &backup_path).map_err(|e| CortexError::from(SnapshotError::RestoreFailed(e.to_string())))?;

        let restore_result = fs::copy(&snap_path, &db_path).and_then(|_| {
            if let Some(parent) = db_path.parent() {
                let db_name = db_path.file_name().and_then(|n| n.to_str()).unwrap_or_default();
                for entry in fs::read_dir(parent)?.flatten() {
                    let fname = entry.file_name();
                    let fname = fname.to_string_lossy();
                    if fname.starts_with(db_name) && fname != db_name {
                        let _ = fs::remove_file(entry.path());
                    }
                }
            }
            Ok(())
        });

        match restore_result {
            Ok(()) => {
                tracing::info!(name, path = %snap.path, "snapshot restored");
                Ok(())
            }
            Err(e) => {
                let _ = fs::copy(&backup_path, &db_path);
                Err(CortexError::from(SnapshotError::RestoreFailed(e.to_string())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;

    #[tokio::test]
    async fn create_snapshot_writes_db_and_sidecar() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cortex.db");
        let pool = Arc::new(Pool::open(&db_path, &StorageConfig::default()).unwrap());
        let mgr = SnapshotManagerImpl::new(pool).unwrap();

        let info = mgr.create_snapshot("test").await.unwrap();
        assert!(std::path::Path::new(&info.path).exists());

        let listed = mgr.list_snapshots().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "test");
    }

    #[tokio::test]
    async fn restore_unknown_snapshot_errors() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("cortex.db");
        let pool = Arc::new(Pool::open(&db_path, &StorageConfig::default()).unwrap());
        let mgr = SnapshotManagerImpl::new(pool).unwrap();

        let err = mgr.restore_snapshot("missing").await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
