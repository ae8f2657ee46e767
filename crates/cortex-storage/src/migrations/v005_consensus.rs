use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// Trust/voting tables. `consensus_votes` (v1) and `consensus_votes_v2`
/// both exist side by side; v1 writes clamp `consensus_score` at
/// insert time, v2 accumulates unclamped.
pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE agents (
            agent_id TEXT PRIMARY KEY,
            reputation REAL NOT NULL DEFAULT 1.0,
            created_at TEXT NOT NULL
        );

        CREATE TABLE consensus_votes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fact_id INTEGER NOT NULL REFERENCES facts(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL,
            value INTEGER NOT NULL,
            weight REAL NOT NULL DEFAULT 1.0,
            reputation_at_vote REAL NOT NULL DEFAULT 1.0,
            created_at TEXT NOT NULL,
            UNIQUE(fact_id, agent_id)
        );
        CREATE INDEX idx_consensus_votes_fact ON consensus_votes(fact_id);

        CREATE TABLE consensus_votes_v2 (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fact_id INTEGER NOT NULL REFERENCES facts(id) ON DELETE CASCADE,
            agent_id TEXT NOT NULL,
            value INTEGER NOT NULL,
            weight REAL NOT NULL DEFAULT 1.0,
            reputation_at_vote REAL NOT NULL DEFAULT 1.0,
            created_at TEXT NOT NULL,
            UNIQUE(fact_id, agent_id)
        );
        CREATE INDEX idx_consensus_votes_v2_fact ON consensus_votes_v2(fact_id);
        ",
    )
    .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
    Ok(())
}
