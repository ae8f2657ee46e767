mod embedding;
mod fact;
mod graph;
mod ops;
mod query;
mod retrieval;
mod transaction;
mod vote;

pub use embedding::{Embedding, KnnHit};
pub use fact::{meta_keys, Confidence, Fact, FactType};
pub use graph::{
    Entity, ExtractedEntity, ExtractedGraph, ExtractedRelation, Ghost, GhostStatus,
    GraphOutboxEntry, OutboxStatus, PathEdge, Relation, Subgraph,
};
pub use ops::{CompactionResult, CompactionStrategy, SnapshotInfo, Stats};
pub use query::{SearchQuery, TemporalPredicate};
pub use retrieval::{RankedHit, SearchResult, VectorBackendStatus};
pub use transaction::{HashVersion, IntegrityReport, IntegrityViolation, MerkleCheckpoint, Transaction};
pub use vote::{Agent, Vote};
