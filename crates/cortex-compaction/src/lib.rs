//! Non-destructive dedup, error-merge, and staleness-prune compaction.

pub mod compactor;

pub use compactor::CompactorImpl;
