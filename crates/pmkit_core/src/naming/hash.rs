//! Bucket hashing for seed ids.

use crate::naming::layout::TABLE_MASK;
use xxhash_rust::xxh32::xxh32;

/// Seed of the id hash.
pub const HASH_SEED: u32 = 0x06e2_56e2;

/// Hashes a seed id.
///
/// Only stability within one build matters: a table written by one version
/// is read back by the same version.
pub fn seed_hash(id: &[u8]) -> u32 {
    xxh32(id, HASH_SEED)
}

/// Bucket index of `id`.
pub(crate) fn bucket_of(id: &[u8]) -> usize {
    (seed_hash(id) & TABLE_MASK) as usize
}
