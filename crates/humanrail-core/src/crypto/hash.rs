//! SHA-256 content hashing
//!
//! Single place where the digest algorithm is chosen. Entity identifiers,
//! receipt hashes and Merkle nodes all go through [`hash`] or [`hasher`].

use sha2::{Digest, Sha256};

/// Digest length in bytes.
pub const DIGEST_LEN: usize = 32;

/// Hash arbitrary bytes to a 32-byte SHA-256 digest.
#[inline]
pub fn hash(data: &[u8]) -> [u8; 32] {
    let mut h = Sha256::new();
    h.update(data);
    h.finalize().into()
}

/// Incremental SHA-256 hasher for multi-part inputs.
#[derive(Debug, Clone, Default)]
pub struct Hasher(Sha256);

impl Hasher {
    /// Feed more bytes.
    pub fn update(&mut self, data: impl AsRef<[u8]>) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    /// Consume the hasher and return the digest.
    pub fn finalize(self) -> [u8; 32] {
        self.0.finalize().into()
    }
}

/// Create an incremental hasher.
#[inline]
pub fn hasher() -> Hasher {
    Hasher::default()
}

/// Hash a seed tag followed by each part, in order.
///
/// Used for deterministic entity ids: `(tag, principal, nonce)` and similar.
pub fn hash_seeds(tag: &[u8], parts: &[&[u8]]) -> [u8; 32] {
    let mut h = hasher();
    h.update(tag);
    for part in parts {
        h.update(part);
    }
    h.finalize()
}
