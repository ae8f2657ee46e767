use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// Per-fact embedding storage. A plain table of LE-f32 BLOBs, not a
/// `vec0` virtual table: this workspace carries no offline-buildable
/// vector-index extension, so KNN is a brute-force cosine scan over these
/// rows.
pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE fact_embeddings (
            fact_id INTEGER PRIMARY KEY REFERENCES facts(id) ON DELETE CASCADE,
            vector BLOB NOT NULL,
            dimension INTEGER NOT NULL
        );
        ",
    )
    .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
    Ok(())
}
