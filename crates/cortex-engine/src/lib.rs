//! The composed Cortex memory engine: every subsystem crate wired into
//! one facade, plus a synchronous variant for callers without a Tokio
//! runtime.

pub mod blocking;
pub mod embedder;
pub mod engine;

pub use blocking::BlockingCortex;
pub use embedder::{DeterministicEmbedder, NullEmbedder};
pub use engine::CortexEngine;
