//! Concrete `Embedder` implementations the core ships without depending
//! on an actual ML model, providing synthetic, dependency-free
//! fixtures standing in for a real model during tests and local use.

use cortex_core::errors::CortexResult;
use cortex_core::traits::Embedder;
use sha2::{Digest, Sha256};

/// Default embedder when no model is wired in: `embed` always fails with
/// `BackendUnavailable`-shaped storage error, matching `auto_embed=false`
/// behavior — callers relying on `store`'s best-effort embedding path see
/// the failure logged and skipped, never propagated.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEmbedder;

impl Embedder for NullEmbedder {
    async fn embed(&self, _text: &str) -> CortexResult<Vec<f32>> {
        Err(cortex_core::errors::CortexError::Storage(
            cortex_core::errors::StorageError::Sqlite("no embedder configured".to_string()),
        ))
    }
}

/// Deterministic, ML-free embedder for tests and demos: hashes the input
/// text and expands the digest into a fixed-dimension pseudo-vector. Same
/// input always yields the same vector, which is all the hybrid search
/// tests need (no real semantic structure).
#[derive(Debug, Clone, Copy)]
pub struct DeterministicEmbedder {
    dimension: usize,
}

impl DeterministicEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }
}

impl Default for DeterministicEmbedder {
    fn default() -> Self {
        Self::new(384)
    }
}

impl Embedder for DeterministicEmbedder {
    async fn embed(&self, text: &str) -> CortexResult<Vec<f32>> {
        let mut out = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if out.len() >= self.dimension {
                    break;
                }
                let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                out.push((bits as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            counter += 1;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_embedder_is_stable() {
        let e = DeterministicEmbedder::new(16);
        let a = e.embed("hello world").await.unwrap();
        let b = e.embed("hello world").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn deterministic_embedder_varies_with_input() {
        let e = DeterministicEmbedder::new(16);
        let a = e.embed("alpha").await.unwrap();
        let b = e.embed("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn null_embedder_always_errors() {
        assert!(NullEmbedder.embed("x").await.is_err());
    }
}
