//! Hashing, Merkle commitments and Ed25519 helpers

/// SHA-256 digests
pub mod hash;
/// Batch commitments
pub mod merkle;

pub use hash::{hash, hash_seeds, hasher, Hasher, DIGEST_LEN};
pub use merkle::{
    merkle_proof, merkle_root, verify_merkle_proof, MerkleProof, MerkleValidationError,
};

use crate::errors::{RailError, RailResult};
use crate::identifiers::Address;
use ed25519_dalek::{Signature, VerifyingKey};

/// Ed25519 signature length in bytes.
pub const SIGNATURE_LEN: usize = 64;

/// Verify an Ed25519 signature by `signer` over `message`.
///
/// Uses strict verification so small-order keys and malleable signatures are
/// rejected. Every failure maps to [`RailError::SignatureInvalid`].
pub fn verify_ed25519(
    signer: &Address,
    message: &[u8],
    signature: &[u8; SIGNATURE_LEN],
) -> RailResult<()> {
    let key = VerifyingKey::from_bytes(signer.as_bytes()).map_err(|_| RailError::SignatureInvalid)?;
    let sig = Signature::from_bytes(signature);
    key.verify_strict(message, &sig)
        .map_err(|_| RailError::SignatureInvalid)
}
