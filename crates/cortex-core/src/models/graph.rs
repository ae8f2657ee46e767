use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An extracted entity. Unique per `(name, project)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub id: i64,
    pub name: String,
    pub entity_type: String,
    pub project: String,
    pub mention_count: i64,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
}

/// A directed, weighted edge between two entities, with the fact that
/// originated it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relation {
    pub id: i64,
    pub source_entity_id: i64,
    pub target_entity_id: i64,
    pub relation_type: String,
    pub weight: f64,
    pub fact_id: i64,
    pub created_at: DateTime<Utc>,
}

/// Status of a dangling reference awaiting resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GhostStatus {
    Open,
    Resolved,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ghost {
    pub id: i64,
    pub reference: String,
    pub context: String,
    pub project: String,
    pub status: GhostStatus,
    pub target_entity: Option<String>,
    pub confidence: Option<f64>,
    pub created_at: DateTime<Utc>,
}

/// Entities and relation-type assertions produced by the graph extractor
/// for one fact, prior to being upserted into storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedGraph {
    pub entities: Vec<ExtractedEntity>,
    pub relations: Vec<ExtractedRelation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    pub name: String,
    pub entity_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    pub source_name: String,
    pub target_name: String,
    pub relation_type: String,
}

/// One node + its edges, returned by `get_graph`/`get_context_subgraph`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subgraph {
    pub entities: Vec<Entity>,
    pub relations: Vec<Relation>,
}

/// An ordered edge list describing one path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathEdge {
    pub source_entity_id: i64,
    pub target_entity_id: i64,
    pub relation_type: String,
}

/// Status of a queued graph mutation awaiting downstream sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphOutboxEntry {
    pub id: i64,
    pub fact_id: i64,
    pub action: String,
    pub status: OutboxStatus,
    pub retry_count: i64,
    pub processed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}
