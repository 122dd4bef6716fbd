// Key Hashing
//
// The extendible hash index is disk-backed, so key hashes must be stable
// across process restarts. std's default hasher is randomly seeded per
// process and cannot be used here.

/// Hash raw key bytes with a 64-bit hash, downcast to 32 bits for
/// extendible hashing (directory indices use at most 32 bits).
pub fn hash_key(bytes: &[u8]) -> u32 {
    twox_hash::xxh3::hash64(bytes) as u32
}
