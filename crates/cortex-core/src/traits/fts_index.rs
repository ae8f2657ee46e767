use crate::errors::CortexResult;
use crate::models::RankedHit;

/// Lexical search index kept synchronous with fact state via triggers.
/// Implementations own query sanitization (tokenize and quote each
/// token to disarm FTS operator characters).
#[allow(async_fn_in_trait)]
pub trait IFtsIndex: Send + Sync {
    async fn search(
        &self,
        query: &str,
        k: usize,
        project: Option<&str>,
    ) -> CortexResult<Vec<RankedHit>>;
}
