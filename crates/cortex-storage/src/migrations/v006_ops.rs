use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// Compaction audit log.
pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE compaction_log (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project TEXT NOT NULL,
            strategies TEXT NOT NULL,
            deprecated_ids TEXT NOT NULL,
            new_fact_ids TEXT NOT NULL,
            before_count INTEGER NOT NULL,
            after_count INTEGER NOT NULL,
            dry_run INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );
        ",
    )
    .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
    Ok(())
}
