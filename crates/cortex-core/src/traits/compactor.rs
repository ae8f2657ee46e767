use crate::errors::CortexResult;
use crate::models::{CompactionResult, CompactionStrategy};

/// Dedup, error-merge, staleness-prune strategies; always non-destructive.
#[allow(async_fn_in_trait)]
pub trait ICompactor: Send + Sync {
    async fn compact(
        &self,
        project: &str,
        strategies: &[CompactionStrategy],
        dry_run: bool,
    ) -> CortexResult<CompactionResult>;
}
