//! Canonical hash construction.
//!
//! Deterministic serialization plus null-byte-separated SHA-256 over the
//! ledger's five hashed fields. A null byte separates fields instead of a
//! colon or JSON-field boundary: "a:b" + "c" and "a" + "b:c" must never
//! collide, and \x00 is rejected from every hashed input field elsewhere
//! in the engine, so the separator itself can never appear inside a field.

mod canonical;
mod tx_hash;

pub use canonical::canonical_string;
pub use tx_hash::{compute_hash, compute_hash_legacy, verify_hash, GENESIS_HASH};
