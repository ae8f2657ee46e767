use crate::errors::CortexResult;
use crate::models::SnapshotInfo;

/// Consistent physical copies at named transaction points.
#[allow(async_fn_in_trait)]
pub trait ISnapshotManager: Send + Sync {
    async fn create_snapshot(&self, name: &str) -> CortexResult<SnapshotInfo>;

    async fn list_snapshots(&self) -> CortexResult<Vec<SnapshotInfo>>;

    async fn restore_snapshot(&self, name: &str) -> CortexResult<()>;
}
