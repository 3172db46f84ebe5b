//! Identifier types
//!
//! [`Address`] is a raw 32-byte Ed25519 public key: wallets, issuer
//! authorities, agent signing keys and payment destinations all use it.
//!
//! Entity ids are SHA-256 digests of a seed tag followed by the entity's
//! natural key, so any client can derive them without asking the registry.
//! For example a capability id is `H("capability" || principal || agent || nonce_le)`.

use crate::crypto::hash::hash_seeds;
use crate::errors::RailError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

fn parse_hex32(s: &str) -> Result<[u8; 32], RailError> {
    let bytes = hex::decode(s).map_err(|e| RailError::malformed(format!("invalid hex: {e}")))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| RailError::malformed(format!("expected 32 bytes, got {}", v.len())))
}

macro_rules! id32 {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub [u8; 32]);

        impl $name {
            /// Wrap raw bytes
            pub const fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Borrow raw bytes
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Copy out raw bytes
            pub fn to_bytes(&self) -> [u8; 32] {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "-{}"), hex::encode(&self.0[..8]))
            }
        }

        impl FromStr for $name {
            type Err = RailError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                parse_hex32(s).map(Self)
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }
    };
}

id32!(
    /// 32-byte Ed25519 public key of a wallet, authority, agent key or destination
    Address,
    "addr"
);
id32!(
    /// Human profile id, derived from the owning wallet
    ProfileId,
    "profile"
);
id32!(
    /// Issuer id, derived from the issuer authority
    IssuerId,
    "issuer"
);
id32!(
    /// Attestation id, derived from `(profile, issuer, nonce)`
    AttestationId,
    "attestation"
);
id32!(
    /// Agent id, derived from `(principal, nonce)`
    AgentId,
    "agent"
);
id32!(
    /// Capability id, derived from `(principal, agent, nonce)`
    CapabilityId,
    "capability"
);
id32!(
    /// Usage record id, derived from `(capability, sequence)`
    UsageId,
    "usage"
);
id32!(
    /// Receipt id, derived from `(agent, nonce)`
    ReceiptId,
    "receipt"
);

/// Seed tags for id derivation.
pub mod seeds {
    /// Human profile seed
    pub const HUMAN_PROFILE: &[u8] = b"human_profile";
    /// Issuer seed
    pub const ISSUER: &[u8] = b"issuer";
    /// Attestation seed
    pub const ATTESTATION: &[u8] = b"attestation";
    /// Agent seed
    pub const AGENT: &[u8] = b"agent";
    /// Capability seed
    pub const CAPABILITY: &[u8] = b"capability";
    /// Usage record seed
    pub const USAGE: &[u8] = b"usage";
    /// Receipt seed
    pub const RECEIPT: &[u8] = b"receipt";
}

impl ProfileId {
    /// Profile owned by `wallet`
    pub fn derive(wallet: &Address) -> Self {
        Self(hash_seeds(seeds::HUMAN_PROFILE, &[wallet.as_bytes()]))
    }
}

impl IssuerId {
    /// Issuer controlled by `authority`
    pub fn derive(authority: &Address) -> Self {
        Self(hash_seeds(seeds::ISSUER, &[authority.as_bytes()]))
    }
}

impl AttestationId {
    /// Attestation `nonce` from `issuer` about `profile`
    pub fn derive(profile: &ProfileId, issuer: &IssuerId, nonce: u64) -> Self {
        Self(hash_seeds(
            seeds::ATTESTATION,
            &[profile.as_bytes(), issuer.as_bytes(), &nonce.to_le_bytes()],
        ))
    }
}

impl AgentId {
    /// Agent `nonce` registered by `principal`
    pub fn derive(principal: &Address, nonce: u64) -> Self {
        Self(hash_seeds(
            seeds::AGENT,
            &[principal.as_bytes(), &nonce.to_le_bytes()],
        ))
    }
}

impl CapabilityId {
    /// Capability `nonce` from `principal` to `agent`
    pub fn derive(principal: &Address, agent: &AgentId, nonce: u64) -> Self {
        Self(hash_seeds(
            seeds::CAPABILITY,
            &[principal.as_bytes(), agent.as_bytes(), &nonce.to_le_bytes()],
        ))
    }
}

impl UsageId {
    /// Usage record number `sequence` of `capability`
    pub fn derive(capability: &CapabilityId, sequence: u64) -> Self {
        Self(hash_seeds(
            seeds::USAGE,
            &[capability.as_bytes(), &sequence.to_le_bytes()],
        ))
    }
}

impl ReceiptId {
    /// Receipt `nonce` emitted for `agent`
    pub fn derive(agent: &AgentId, nonce: u64) -> Self {
        Self(hash_seeds(
            seeds::RECEIPT,
            &[agent.as_bytes(), &nonce.to_le_bytes()],
        ))
    }
}
