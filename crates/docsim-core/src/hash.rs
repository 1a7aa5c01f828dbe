//! Stable hashing helpers: scenario fingerprints and hash-sharding buckets.

use blake3::Hasher;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }

    /// First eight bytes as a little-endian integer.
    pub fn prefix_u64(&self) -> u64 {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(&self.0[..8]);
        u64::from_le_bytes(buf)
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    let out = h.finalize();
    Hash256(out.into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v).map_err(|e| crate::error::Error::Hash(e.to_string()))?;
    Ok(hash_bytes(&bytes))
}

/// Hash bucket for the `ordinal`-th key value of a shard key.
///
/// `seed` scopes the hash (collection + key fields) so two collections with
/// the same key names still spread independently. Same inputs, same bucket.
pub fn bucket_of(seed: &str, ordinal: u64, buckets: usize) -> usize {
    if buckets == 0 {
        return 0;
    }
    let mut h = Hasher::new();
    h.update(seed.as_bytes());
    h.update(&[0]);
    h.update(&ordinal.to_le_bytes());
    let out = Hash256(h.finalize().into());
    (out.prefix_u64() % buckets as u64) as usize
}
