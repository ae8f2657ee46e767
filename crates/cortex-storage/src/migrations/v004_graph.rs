use rusqlite::Connection;

use cortex_core::errors::{CortexResult, StorageError};

/// Entity/relation graph tables, dangling-reference ghosts, and the CDC
/// outbox.
pub fn migrate(conn: &Connection) -> CortexResult<()> {
    conn.execute_batch(
        "
        CREATE TABLE entities (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            entity_type TEXT NOT NULL,
            project TEXT NOT NULL,
            mention_count INTEGER NOT NULL DEFAULT 1,
            first_seen TEXT NOT NULL,
            last_seen TEXT NOT NULL,
            UNIQUE(name, project)
        );
        CREATE INDEX idx_entities_project ON entities(project);
        CREATE INDEX idx_entities_mentions ON entities(project, mention_count DESC);

        CREATE TABLE entity_relations (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            source_entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            target_entity_id INTEGER NOT NULL REFERENCES entities(id) ON DELETE CASCADE,
            relation_type TEXT NOT NULL,
            weight REAL NOT NULL DEFAULT 1.0,
            fact_id INTEGER NOT NULL REFERENCES facts(id) ON DELETE CASCADE,
            created_at TEXT NOT NULL,
            UNIQUE(source_entity_id, target_entity_id, relation_type)
        );
        CREATE INDEX idx_relations_source ON entity_relations(source_entity_id);
        CREATE INDEX idx_relations_target ON entity_relations(target_entity_id);
        CREATE INDEX idx_relations_fact ON entity_relations(fact_id);

        CREATE TABLE ghosts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            reference TEXT NOT NULL,
            context TEXT NOT NULL,
            project TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'open',
            target_entity TEXT,
            confidence REAL,
            created_at TEXT NOT NULL
        );
        CREATE INDEX idx_ghosts_project_status ON ghosts(project, status);
        CREATE INDEX idx_ghosts_reference_project_status ON ghosts(reference, project, status);

        CREATE TABLE graph_outbox (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            fact_id INTEGER NOT NULL,
            action TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending',
            retry_count INTEGER NOT NULL DEFAULT 0,
            processed_at TEXT,
            created_at TEXT NOT NULL
        );
        CREATE INDEX idx_outbox_status ON graph_outbox(status);
        ",
    )
    .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;
    Ok(())
}
