use super::{
    CompactionError, ErrorKind, FederationError, GraphError, LedgerError, RetrievalError,
    SnapshotError, StorageError,
};

/// Top-level error type for the Cortex memory engine.
/// All subsystem errors convert into this via `From`.
#[derive(Debug, thiserror::Error)]
pub enum CortexError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("retrieval error: {0}")]
    Retrieval(#[from] RetrievalError),

    #[error("compaction error: {0}")]
    Compaction(#[from] CompactionError),

    #[error("snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    #[error("federation error: {0}")]
    Federation(#[from] FederationError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),
}

impl CortexError {
    /// The error kind a caller should branch on.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CortexError::InvalidInput(_) => ErrorKind::InvalidInput,
            CortexError::NotFound(_) => ErrorKind::NotFound,
            CortexError::Storage(e) => e.kind(),
            CortexError::Ledger(e) => e.kind(),
            CortexError::Graph(e) => e.kind(),
            CortexError::Retrieval(e) => e.kind(),
            CortexError::Compaction(e) => e.kind(),
            CortexError::Snapshot(e) => e.kind(),
            CortexError::Federation(e) => e.kind(),
            CortexError::Serialization(_) => ErrorKind::Transient,
            CortexError::ResourceExhausted(_) => ErrorKind::ResourceExhausted,
        }
    }
}

/// Convenience alias used throughout the engine.
pub type CortexResult<T> = Result<T, CortexError>;
