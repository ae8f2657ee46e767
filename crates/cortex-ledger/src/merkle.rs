//! Merkle tree over a contiguous range of transaction hashes, used to
//! seal checkpoints. Ported from the original project's
//! `MerkleTree`: bottom-up pairwise hashing, a lone right child
//! duplicates its left sibling rather than being dropped.

use sha2::{Digest, Sha256};

fn hash_pair(left: &str, right: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    let digest = hasher.finalize();
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

/// Fold `leaves` up to a single root hash. `None` for an empty input.
pub fn compute_root(leaves: &[String]) -> Option<String> {
    if leaves.is_empty() {
        return None;
    }
    let mut level: Vec<String> = leaves.to_vec();
    while level.len() > 1 {
        let mut next = Vec::with_capacity(level.len().div_ceil(2));
        let mut i = 0;
        while i < level.len() {
            let left = &level[i];
            let right = if i + 1 < level.len() { &level[i + 1] } else { left };
            next.push(hash_pair(left, right));
            i += 2;
        }
        level = next;
    }
    level.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_leaf_is_its_own_root() {
        assert_eq!(compute_root(&["a".into()]), Some("a".to_string()));
    }

    #[test]
    fn empty_input_has_no_root() {
        assert_eq!(compute_root(&[]), None);
    }

    #[test]
    fn odd_count_duplicates_last_leaf() {
        let three = compute_root(&["a".into(), "b".into(), "c".into()]);
        let four = compute_root(&["a".into(), "b".into(), "c".into(), "c".into()]);
        assert_eq!(three, four);
    }

    #[test]
    fn deterministic_and_order_sensitive() {
        let a = compute_root(&["a".into(), "b".into()]);
        let b = compute_root(&["b".into(), "a".into()]);
        assert_ne!(a, b);
        assert_eq!(a, compute_root(&["a".into(), "b".into()]));
    }
}
