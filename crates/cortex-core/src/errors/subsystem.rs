use super::ErrorKind;

/// Storage subsystem errors (fact store, embedding index, FTS index).
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("fact not found: {id}")]
    FactNotFound { id: i64 },

    #[error("connection pool exhausted")]
    PoolExhausted,

    #[error("connection lock poisoned: {0}")]
    Poisoned(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::InvalidInput(_) => ErrorKind::InvalidInput,
            StorageError::FactNotFound { .. } => ErrorKind::NotFound,
            StorageError::PoolExhausted => ErrorKind::ResourceExhausted,
            StorageError::Sqlite(_) | StorageError::Poisoned(_) | StorageError::MigrationFailed(_) => {
                ErrorKind::Transient
            }
        }
    }
}

/// Ledger subsystem errors (hash chain, Merkle checkpoints, integrity).
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("append failed: {0}")]
    AppendFailed(String),

    #[error("checkpoint creation failed: {0}")]
    CheckpointFailed(String),

    #[error("chain break at tx {tx_id}")]
    ChainBreak { tx_id: i64 },

    #[error("hash mismatch at tx {tx_id}")]
    HashMismatch { tx_id: i64 },

    #[error("merkle mismatch at checkpoint {checkpoint_id}")]
    MerkleMismatch { checkpoint_id: i64 },

    #[error("transaction not found: {tx_id}")]
    TransactionNotFound { tx_id: i64 },
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::ChainBreak { .. }
            | LedgerError::HashMismatch { .. }
            | LedgerError::MerkleMismatch { .. } => ErrorKind::IntegrityViolation,
            LedgerError::TransactionNotFound { .. } => ErrorKind::NotFound,
            LedgerError::AppendFailed(_) | LedgerError::CheckpointFailed(_) => ErrorKind::Transient,
        }
    }
}

/// Graph subsystem errors (extraction, entity/relation store, CDC outbox).
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("entity not found: {name}")]
    EntityNotFound { name: String },

    #[error("upsert failed: {0}")]
    UpsertFailed(String),

    #[error("remote graph backend unavailable: {reason}")]
    RemoteUnavailable { reason: String },
}

impl GraphError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GraphError::EntityNotFound { .. } => ErrorKind::NotFound,
            GraphError::RemoteUnavailable { .. } => ErrorKind::BackendUnavailable,
            GraphError::UpsertFailed(_) => ErrorKind::Transient,
        }
    }
}

/// Retrieval subsystem errors (hybrid search, KNN, FTS).
#[derive(Debug, thiserror::Error)]
pub enum RetrievalError {
    #[error("vector backend unavailable: {reason}")]
    VectorUnavailable { reason: String },

    #[error("query failed: {0}")]
    QueryFailed(String),
}

impl RetrievalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RetrievalError::VectorUnavailable { .. } => ErrorKind::BackendUnavailable,
            RetrievalError::QueryFailed(_) => ErrorKind::Transient,
        }
    }
}

/// Compaction subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum CompactionError {
    #[error("strategy '{strategy}' failed: {reason}")]
    StrategyFailed { strategy: String, reason: String },
}

impl CompactionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Transient
    }
}

/// Snapshot subsystem errors.
#[derive(Debug, thiserror::Error)]
pub enum SnapshotError {
    #[error("backup failed: {0}")]
    BackupFailed(String),

    #[error("restore failed: {0}")]
    RestoreFailed(String),

    #[error("snapshot not found: {name}")]
    NotFound { name: String },
}

impl SnapshotError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SnapshotError::NotFound { .. } => ErrorKind::NotFound,
            SnapshotError::BackupFailed(_) | SnapshotError::RestoreFailed(_) => ErrorKind::Transient,
        }
    }
}

/// Federation subsystem errors (shard routing).
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("invalid tenant id: {0}")]
    InvalidTenantId(String),

    #[error("shard unavailable for tenant {tenant}: {reason}")]
    ShardUnavailable { tenant: String, reason: String },
}

impl FederationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FederationError::InvalidTenantId(_) => ErrorKind::InvalidInput,
            FederationError::ShardUnavailable { .. } => ErrorKind::Transient,
        }
    }
}
