//! `IGraphStore` implementation over `entities`/`entity_relations`,
//! grounded in the original project's `SQLiteBackend` and its
//! BFS-based `find_path`/`find_context_subgraph`.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};

use cortex_core::errors::CortexResult;
use cortex_core::models::{Entity, PathEdge, Relation, Subgraph};
use cortex_core::traits::IGraphStore;
use cortex_storage::pool::Pool;
use cortex_storage::to_storage_err;

pub struct GraphStoreImpl {
    pool: Arc<Pool>,
}

impl GraphStoreImpl {
    pub fn new(pool: Arc<Pool>) -> Self {
        Self { pool }
    }
}

fn entity_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Entity> {
    let first_seen: String = row.get(4)?;
    let last_seen: String = row.get(5)?;
    Ok(Entity {
        id: row.get(0)?,
        name: row.get(1)?,
        entity_type: row.get(2)?,
        project: row.get(3)?,
        first_seen: parse_ts(&first_seen),
        last_seen: parse_ts(&last_seen),
        mention_count: row.get(6)?,
    })
}

fn relation_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Relation> {
    let created_at: String = row.get(6)?;
    Ok(Relation {
        id: row.get(0)?,
        source_entity_id: row.get(1)?,
        target_entity_id: row.get(2)?,
        relation_type: row.get(3)?,
        weight: row.get(4)?,
        fact_id: row.get(5)?,
        created_at: parse_ts(&created_at),
    })
}

fn parse_ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

const ENTITY_COLUMNS: &str = "id, name, entity_type, project, first_seen, last_seen, mention_count";
const RELATION_COLUMNS: &str = "id, source_entity_id, target_entity_id, relation_type, weight, fact_id, created_at";

impl IGraphStore for GraphStoreImpl {
    async fn upsert_entity(
        &self,
        name: &str,
        entity_type: &str,
        project: &str,
        ts: DateTime<Utc>,
    ) -> CortexResult<i64> {
        let name = name.to_string();
        let entity_type = entity_type.to_string();
        let project = project.to_string();

        self.pool
            .with_writer(move |conn| {
                let existing: Option<(i64, i64)> = conn
                    .query_row(
                        "SELECT id, mention_count FROM entities WHERE name = ?1 AND project = ?2",
                        params![name, project],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                if let Some((id, count)) = existing {
                    conn.execute(
                        "UPDATE entities SET mention_count = ?2, last_seen = ?3 WHERE id = ?1",
                        params![id, count + 1, ts.to_rfc3339()],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(id)
                } else {
                    conn.execute(
                        "INSERT INTO entities (name, entity_type, project, first_seen, last_seen, mention_count)
                         VALUES (?1, ?2, ?3, ?4, ?4, 1)",
                        params![name, entity_type, project, ts.to_rfc3339()],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(conn.last_insert_rowid())
                }
            })
            .await
    }

    async fn upsert_relation(
        &self,
        source_id: i64,
        target_id: i64,
        relation_type: &str,
        fact_id: i64,
        ts: DateTime<Utc>,
    ) -> CortexResult<i64> {
        let relation_type = relation_type.to_string();

        self.pool
            .with_writer(move |conn| {
                // Keyed by the schema's (source, target, relation_type) uniqueness
                // rather than the original project's looser (source, target) key,
                // so two distinct relation types between the same pair of
                // entities are tracked as separate edges instead of overwriting
                // each other's type on every re-detection.
                let existing: Option<(i64, f64)> = conn
                    .query_row(
                        "SELECT id, weight FROM entity_relations
                         WHERE source_entity_id = ?1 AND target_entity_id = ?2 AND relation_type = ?3",
                        params![source_id, target_id, relation_type],
                        |row| Ok((row.get(0)?, row.get(1)?)),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                if let Some((id, weight)) = existing {
                    conn.execute(
                        "UPDATE entity_relations SET weight = ?2 WHERE id = ?1",
                        params![id, weight + 0.5],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(id)
                } else {
                    conn.execute(
                        "INSERT INTO entity_relations
                            (source_entity_id, target_entity_id, relation_type, weight, fact_id, created_at)
                         VALUES (?1, ?2, ?3, 1.0, ?4, ?5)",
                        params![source_id, target_id, relation_type, fact_id, ts.to_rfc3339()],
                    )
                    .map_err(|e| to_storage_err(e.to_string()))?;
                    Ok(conn.last_insert_rowid())
                }
            })
            .await
    }

    async fn get_graph(&self, project: Option<&str>, limit: usize) -> CortexResult<Subgraph> {
        let project = project.map(|p| p.to_string());
        let limit = limit as i64;

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities {} ORDER BY mention_count DESC LIMIT ?{}",
                    if project.is_some() { "WHERE project = ?1" } else { "" },
                    if project.is_some() { 2 } else { 1 },
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let rows = if let Some(p) = &project {
                    stmt.query_map(params![p, limit], entity_from_row)
                } else {
                    stmt.query_map(params![limit], entity_from_row)
                }
                .map_err(|e| to_storage_err(e.to_string()))?;

                let mut entities = Vec::new();
                for row in rows {
                    entities.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }

                let relations = if entities.is_empty() {
                    Vec::new()
                } else {
                    let ids: Vec<i64> = entities.iter().map(|e| e.id).collect();
                    let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                    let sql = format!(
                        "SELECT {RELATION_COLUMNS} FROM entity_relations
                         WHERE source_entity_id IN ({placeholders}) OR target_entity_id IN ({placeholders})"
                    );
                    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                    let all_params: Vec<&dyn rusqlite::ToSql> =
                        ids.iter().chain(ids.iter()).map(|i| i as &dyn rusqlite::ToSql).collect();
                    let rows = stmt
                        .query_map(all_params.as_slice(), relation_from_row)
                        .map_err(|e| to_storage_err(e.to_string()))?;
                    let mut out = Vec::new();
                    for row in rows {
                        out.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                    }
                    out
                };

                Ok(Subgraph { entities, relations })
            })
            .await
    }

    async fn query_entity(&self, name: &str, project: Option<&str>) -> CortexResult<Option<Subgraph>> {
        if name.trim().is_empty() {
            return Ok(None);
        }
        let name = name.to_string();
        let project = project.map(|p| p.to_string());

        self.pool
            .with_reader(move |conn| {
                let sql = format!(
                    "SELECT {ENTITY_COLUMNS} FROM entities WHERE name = ?1 {}",
                    if project.is_some() { "AND project = ?2" } else { "" }
                );
                let entity = if let Some(p) = &project {
                    conn.query_row(&sql, params![name, p], entity_from_row)
                } else {
                    conn.query_row(&sql, params![name], entity_from_row)
                }
                .optional()
                .map_err(|e| to_storage_err(e.to_string()))?;

                let Some(entity) = entity else { return Ok(None) };

                let sql = format!(
                    "SELECT {RELATION_COLUMNS} FROM entity_relations
                     WHERE source_entity_id = ?1 OR target_entity_id = ?1
                     ORDER BY weight DESC LIMIT 20"
                );
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let rows = stmt
                    .query_map(params![entity.id], relation_from_row)
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let mut relations = Vec::new();
                for row in rows {
                    relations.push(row.map_err(|e| to_storage_err(e.to_string()))?);
                }

                Ok(Some(Subgraph { entities: vec![entity], relations }))
            })
            .await
    }

    async fn find_path(
        &self,
        source_name: &str,
        target_name: &str,
        max_depth: u32,
    ) -> CortexResult<Option<Vec<PathEdge>>> {
        let source_name = source_name.to_string();
        let target_name = target_name.to_string();

        self.pool
            .with_reader(move |conn| {
                let start_id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM entities WHERE name = ?1",
                        params![source_name],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;
                let end_id: Option<i64> = conn
                    .query_row(
                        "SELECT id FROM entities WHERE name = ?1",
                        params![target_name],
                        |row| row.get(0),
                    )
                    .optional()
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let (Some(start_id), Some(end_id)) = (start_id, end_id) else {
                    return Ok(None);
                };
                if start_id == end_id {
                    return Ok(Some(Vec::new()));
                }

                let mut queue: VecDeque<(i64, Vec<PathEdge>)> = VecDeque::new();
                queue.push_back((start_id, Vec::new()));
                let mut visited: HashSet<i64> = HashSet::from([start_id]);

                while let Some((curr_id, path)) = queue.pop_front() {
                    if path.len() as u32 >= max_depth {
                        continue;
                    }

                    let mut stmt = conn
                        .prepare(
                            "SELECT source_entity_id, target_entity_id, relation_type
                             FROM entity_relations WHERE source_entity_id = ?1 OR target_entity_id = ?1",
                        )
                        .map_err(|e| to_storage_err(e.to_string()))?;
                    let neighbors = stmt
                        .query_map(params![curr_id], |row| {
                            let source: i64 = row.get(0)?;
                            let target: i64 = row.get(1)?;
                            let relation_type: String = row.get(2)?;
                            let other = if source == curr_id { target } else { source };
                            Ok((other, relation_type))
                        })
                        .map_err(|e| to_storage_err(e.to_string()))?;

                    for neighbor in neighbors {
                        let (next_id, relation_type) = neighbor.map_err(|e| to_storage_err(e.to_string()))?;
                        let edge = PathEdge {
                            source_entity_id: curr_id,
                            target_entity_id: next_id,
                            relation_type,
                        };
                        let mut next_path = path.clone();
                        next_path.push(edge);

                        if next_id == end_id {
                            return Ok(Some(next_path));
                        }
                        if visited.insert(next_id) {
                            queue.push_back((next_id, next_path));
                        }
                    }
                }
                Ok(None)
            })
            .await
    }

    async fn get_context_subgraph(&self, seeds: &[String], depth: u32, max_nodes: usize) -> CortexResult<Subgraph> {
        if seeds.is_empty() {
            return Ok(Subgraph { entities: Vec::new(), relations: Vec::new() });
        }
        let seeds = seeds.to_vec();

        self.pool
            .with_reader(move |conn| {
                let placeholders = seeds.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                let sql = format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE name IN ({placeholders})");
                let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                let seed_params: Vec<&dyn rusqlite::ToSql> =
                    seeds.iter().map(|s| s as &dyn rusqlite::ToSql).collect();
                let rows = stmt
                    .query_map(seed_params.as_slice(), entity_from_row)
                    .map_err(|e| to_storage_err(e.to_string()))?;

                let mut entities_by_name = std::collections::HashMap::new();
                let mut current_layer = Vec::new();
                let mut visited = HashSet::new();
                for row in rows {
                    let e = row.map_err(|e| to_storage_err(e.to_string()))?;
                    visited.insert(e.id);
                    current_layer.push(e.id);
                    entities_by_name.insert(e.name.clone(), e);
                }

                let mut relations: Vec<Relation> = Vec::new();
                let mut seen_relation_ids: HashSet<i64> = HashSet::new();

                for _ in 0..depth {
                    if current_layer.is_empty() || entities_by_name.len() >= max_nodes {
                        break;
                    }
                    let placeholders = current_layer.iter().map(|_| "?").collect::<Vec<_>>().join(",");
                    let sql = format!(
                        "SELECT {RELATION_COLUMNS} FROM entity_relations
                         WHERE source_entity_id IN ({placeholders}) OR target_entity_id IN ({placeholders})"
                    );
                    let mut stmt = conn.prepare(&sql).map_err(|e| to_storage_err(e.to_string()))?;
                    let layer_params: Vec<&dyn rusqlite::ToSql> = current_layer
                        .iter()
                        .chain(current_layer.iter())
                        .map(|i| i as &dyn rusqlite::ToSql)
                        .collect();
                    let rows = stmt
                        .query_map(layer_params.as_slice(), relation_from_row)
                        .map_err(|e| to_storage_err(e.to_string()))?;

                    let mut next_layer = Vec::new();
                    for row in rows {
                        let rel = row.map_err(|e| to_storage_err(e.to_string()))?;
                        for endpoint_id in [rel.source_entity_id, rel.target_entity_id] {
                            if visited.insert(endpoint_id) {
                                let entity: Option<Entity> = conn
                                    .query_row(
                                        &format!("SELECT {ENTITY_COLUMNS} FROM entities WHERE id = ?1"),
                                        params![endpoint_id],
                                        entity_from_row,
                                    )
                                    .optional()
                                    .map_err(|e| to_storage_err(e.to_string()))?;
                                if let Some(entity) = entity {
                                    entities_by_name.insert(entity.name.clone(), entity);
                                }
                                next_layer.push(endpoint_id);
                            }
                        }
                        if seen_relation_ids.insert(rel.id) {
                            relations.push(rel);
                        }
                    }
                    current_layer = next_layer;
                    if entities_by_name.len() >= max_nodes {
                        break;
                    }
                }

                Ok(Subgraph {
                    entities: entities_by_name.into_values().collect(),
                    relations,
                })
            })
            .await
    }

    async fn delete_fact_elements(&self, fact_id: i64) -> CortexResult<()> {
        self.pool
            .with_writer(move |conn| {
                conn.execute(
                    "DELETE FROM entity_relations WHERE fact_id = ?1",
                    params![fact_id],
                )
                .map_err(|e| to_storage_err(e.to_string()))?;
                Ok(())
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cortex_core::config::StorageConfig;

    fn store() -> GraphStoreImpl {
        let pool = Arc::new(Pool::open_in_memory(&StorageConfig::default()).unwrap());
        GraphStoreImpl::new(pool)
    }

    #[tokio::test]
    async fn upsert_entity_increments_mention_count() {
        let s = store();
        let now = Utc::now();
        let id1 = s.upsert_entity("cortex", "project", "p", now).await.unwrap();
        let id2 = s.upsert_entity("cortex", "project", "p", now).await.unwrap();
        assert_eq!(id1, id2);
    }

    #[tokio::test]
    async fn find_path_returns_none_for_unknown_entities() {
        let s = store();
        let path = s.find_path("a", "b", 3).await.unwrap();
        assert!(path.is_none());
    }

    #[tokio::test]
    async fn find_path_finds_direct_edge() {
        let s = store();
        let now = Utc::now();
        let a = s.upsert_entity("a", "tool", "p", now).await.unwrap();
        let b = s.upsert_entity("b", "tool", "p", now).await.unwrap();
        s.upsert_relation(a, b, "uses", 1, now).await.unwrap();

        let path = s.find_path("a", "b", 3).await.unwrap().unwrap();
        assert_eq!(path.len(), 1);
        assert_eq!(path[0].relation_type, "uses");
    }

    #[tokio::test]
    async fn get_context_subgraph_expands_one_hop() {
        let s = store();
        let now = Utc::now();
        let a = s.upsert_entity("a", "tool", "p", now).await.unwrap();
        let b = s.upsert_entity("b", "tool", "p", now).await.unwrap();
        s.upsert_relation(a, b, "uses", 1, now).await.unwrap();

        let sub = s.get_context_subgraph(&["a".to_string()], 1, 10).await.unwrap();
        assert!(sub.entities.iter().any(|e| e.name == "b"));
    }
}
