//! Hash-chained, append-only transaction ledger with adaptive Merkle
//! checkpointing.

pub mod ledger;
pub mod merkle;
pub mod rate;

pub use ledger::LedgerImpl;
