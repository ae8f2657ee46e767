mod cortex_error;
mod kind;
mod subsystem;

pub use cortex_error::{CortexError, CortexResult};
pub use kind::ErrorKind;
pub use subsystem::{
    CompactionError, FederationError, GraphError, LedgerError, RetrievalError, SnapshotError,
    StorageError,
};
