//! Hybrid vector + text retrieval via Reciprocal Rank Fusion.

pub mod hybrid_search;

pub use hybrid_search::HybridSearchImpl;
