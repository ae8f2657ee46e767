use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// Schema bookkeeping, the ledger's transaction/checkpoint tables, and the
/// `facts` table itself.
pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE cortex_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE transactions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project TEXT NOT NULL,
            action TEXT NOT NULL,
            detail TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            prev_hash TEXT NOT NULL,
            hash TEXT NOT NULL,
            hash_version TEXT NOT NULL DEFAULT 'v2'
        );
        CREATE INDEX idx_transactions_project ON transactions(project);

        CREATE TABLE merkle_roots (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            root_hash TEXT NOT NULL,
            tx_start_id INTEGER NOT NULL,
            tx_end_id INTEGER NOT NULL,
            tx_count INTEGER NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX idx_merkle_roots_range ON merkle_roots(tx_start_id, tx_end_id);

        CREATE TABLE integrity_checks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            check_type TEXT NOT NULL,
            status TEXT NOT NULL,
            details_json TEXT NOT NULL,
            started_at TEXT NOT NULL,
            completed_at TEXT NOT NULL
        );

        CREATE TABLE facts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            project TEXT NOT NULL,
            fact_type TEXT NOT NULL,
            content TEXT NOT NULL,
            tags TEXT NOT NULL DEFAULT '[]',
            source TEXT,
            meta TEXT NOT NULL DEFAULT '{}',
            confidence TEXT NOT NULL DEFAULT 'stated',
            consensus_score REAL NOT NULL DEFAULT 1.0,
            valid_from TEXT NOT NULL,
            valid_until TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            tx_id INTEGER REFERENCES transactions(id)
        );
        CREATE INDEX idx_facts_project ON facts(project);
        CREATE INDEX idx_facts_active ON facts(project, valid_until);
        CREATE INDEX idx_facts_type ON facts(project, fact_type);
        CREATE INDEX idx_facts_created_at ON facts(created_at);
        ",
    )
    .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
    Ok(())
}
