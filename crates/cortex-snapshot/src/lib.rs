//! Consistent physical database snapshots via `VACUUM INTO`, with a JSON
//! sidecar recording the sealed transaction/Merkle state.

pub mod snapshot_manager;

pub use snapshot_manager::SnapshotManagerImpl;
