//! Migration runner — version tracking, forward-only, one transaction per
//! migration.

mod v001_core_schema;
mod v002_embeddings;
mod v003_fts5;
mod v004_graph;
mod v005_consensus;
mod v006_ops;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use cortex_core::errors::{CortexError, CortexResult, StorageError};

pub const LATEST_VERSION: u32 = 6;

type MigrationFn = fn(&Connection) -> CortexResult<()>;

const MIGRATIONS: [(u32, &str, MigrationFn); 6] = [
    (1, "core_schema", v001_core_schema::migrate),
    (2, "embeddings", v002_embeddings::migrate),
    (3, "fts5", v003_fts5::migrate),
    (4, "graph", v004_graph::migrate),
    (5, "consensus", v005_consensus::migrate),
    (6, "ops", v006_ops::migrate),
];

/// Current schema version, or 0 if `schema_version` does not exist yet.
pub fn current_version(conn: &Connection) -> CortexResult<u32> {
    let exists: bool = conn
        .prepare("SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version'")
        .and_then(|mut stmt| stmt.exists([]))
        .map_err(|e| StorageError::Sqlite(e.to_string()))?;

    if !exists {
        return Ok(0);
    }

    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
        row.get(0)
    })
    .map_err(|e| StorageError::Sqlite(e.to_string()).into())
}

/// Apply every migration newer than the current version, each inside its
/// own transaction. Returns the number of migrations applied.
pub fn run_migrations(conn: &Connection) -> CortexResult<u32> {
    let current = current_version(conn)?;
    let mut applied = 0;

    if current >= LATEST_VERSION {
        debug!("cortex schema up to date (v{current})");
        return Ok(0);
    }

    info!("running cortex migrations: v{current} -> v{LATEST_VERSION}");

    for &(version, name, migrate_fn) in &MIGRATIONS {
        if version <= current {
            continue;
        }

        debug!("applying migration v{version:03}: {name}");
        conn.execute_batch("BEGIN IMMEDIATE")
            .map_err(|e| StorageError::MigrationFailed(format!("begin v{version:03}: {e}")))?;

        match migrate_fn(conn) {
            Ok(()) => {
                conn.execute("INSERT INTO schema_version (version) VALUES (?1)", [version])
                    .map_err(|e| StorageError::MigrationFailed(format!("record v{version:03}: {e}")))?;
                conn.execute_batch("COMMIT")
                    .map_err(|e| StorageError::MigrationFailed(format!("commit v{version:03}: {e}")))?;
                info!("applied migration v{version:03}: {name}");
                applied += 1;
            }
            Err(e) => {
                warn!("migration v{version:03} ({name}) failed: {e}, rolling back");
                let _ = conn.execute_batch("ROLLBACK");
                return Err(CortexError::Storage(StorageError::MigrationFailed(format!(
                    "v{version:03} ({name}): {e}"
                ))));
            }
        }
    }

    info!("applied {applied} cortex migration(s), now at v{LATEST_VERSION}");
    Ok(applied)
}
