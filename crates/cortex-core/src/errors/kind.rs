/// The six error kinds callers branch on.
///
/// Every subsystem error maps to exactly one kind via `.kind()`, so a
/// caller layer can decide retry/surface/degrade policy without matching
/// every leaf variant across every subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller violated a contract. Never retried; surfaced verbatim.
    InvalidInput,
    /// Referenced fact/transaction/entity absent.
    NotFound,
    /// Ledger chain or Merkle mismatch. Never silently repaired.
    IntegrityViolation,
    /// Connection acquisition timeout or pool saturation. Caller may retry.
    ResourceExhausted,
    /// Vector extension missing or remote graph backend down. Degrades silently.
    BackendUnavailable,
    /// Any other storage/IO error during a write. Whole transaction rolls back.
    Transient,
}
