//! Deterministic composite addressing for cross-collection destinations
//! (spec §6 "Composite ID format", §8 invariant 7).

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// `composite_id(owner, mem_id)` — a deterministic function of
/// `(owner_id, source_memory_id)` so republishing the same source to the
/// same destination always upserts the same row. Grounded on the
/// teacher's `sha2`-based content hashing in `crates/memory/src/index.rs`,
/// kept local to this crate since it's the only consumer.
pub fn composite_id(owner_id: &str, memory_id: &str) -> Uuid {
    let mut hasher = Sha256::new();
    hasher.update(owner_id.as_bytes());
    hasher.update(b":");
    hasher.update(memory_id.as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&digest[..16]);
    Uuid::from_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn is_deterministic() {
        assert_eq!(composite_id("u1", "m1"), composite_id("u1", "m1"));
    }

    #[test]
    fn differs_across_owners_or_memories() {
        assert_ne!(composite_id("u1", "m1"), composite_id("u2", "m1"));
        assert_ne!(composite_id("u1", "m1"), composite_id("u1", "m2"));
    }
}
