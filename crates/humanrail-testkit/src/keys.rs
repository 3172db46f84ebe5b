//! Deterministic Ed25519 key fixtures

use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use humanrail_core::Address;
use sha2::{Digest, Sha256};

/// Ed25519 key pair with a stable address
#[derive(Debug, Clone)]
pub struct KeyTestFixture {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl KeyTestFixture {
    /// Key pair from a 32-byte secret seed
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Key pair from SHA-256 of a seed string
    pub fn from_seed_string(seed: &str) -> Self {
        let digest: [u8; 32] = Sha256::digest(seed.as_bytes()).into();
        Self::from_seed(&digest)
    }

    /// Public key as an [`Address`]
    pub fn address(&self) -> Address {
        Address(self.verifying_key.to_bytes())
    }

    /// Signing key
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Verifying key
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Raw signature over `message`
    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        self.signing_key.sign(message).to_bytes()
    }
}
