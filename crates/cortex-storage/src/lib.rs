//! SQLite persistence layer for the Cortex memory engine: the `facts`
//! table and its invariants, the embedding index, and the FTS index
//!. Single writer connection + round-robin
//! reader pool, WAL mode.

pub mod embedding_index;
pub mod fact_store;
pub mod fts_index;
pub mod migrations;
pub mod pool;
pub mod pragmas;
pub mod queries;

pub use embedding_index::EmbeddingIndexImpl;
pub use fact_store::FactStoreImpl;
pub use fts_index::FtsIndexImpl;
pub use pool::Pool;

/// Helper to fold a raw error message into `CortexError::Storage`.
pub fn to_storage_err(msg: String) -> cortex_core::errors::CortexError {
    cortex_core::errors::CortexError::Storage(cortex_core::errors::StorageError::Sqlite(msg))
}
