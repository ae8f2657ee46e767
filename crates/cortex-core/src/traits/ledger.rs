use crate::errors::CortexResult;
use crate::models::{IntegrityReport, MerkleCheckpoint, Transaction};

/// Append transactions, hash-chain, Merkle checkpoints, integrity
/// verification.
#[allow(async_fn_in_trait)]
pub trait ILedger: Send + Sync {
    async fn append(&self, project: &str, action: &str, detail: serde_json::Value) -> CortexResult<i64>;

    async fn create_checkpoint(&self) -> CortexResult<Option<MerkleCheckpoint>>;

    async fn verify_integrity(&self) -> CortexResult<IntegrityReport>;

    async fn get_transaction(&self, tx_id: i64) -> CortexResult<Option<Transaction>>;

    /// Transactions/sec observed over the trailing rate window, used to
    /// pick the adaptive checkpoint batch size.
    fn current_write_rate(&self) -> f64;
}
