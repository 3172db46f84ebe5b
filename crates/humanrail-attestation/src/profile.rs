//! Human profiles and the attestation records that feed them

use crate::issuer::IssuerKind;
use humanrail_core::{Address, AttestationId, Hash32, IssuerId, ProfileId};
use serde::{Deserialize, Serialize};

/// Stored attestation status. Expiry is computed, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttestationStatus {
    /// Counts toward the score until `expires_at`
    #[default]
    Active,
    /// Withdrawn by the issuer or the profile owner
    Revoked,
}

/// Status as observed at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveAttestationStatus {
    /// Active and unexpired
    Active,
    /// Past `expires_at`
    Expired,
    /// Revoked
    Revoked,
}

/// A verified, registered attestation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedAttestation {
    /// Derived from `(profile, issuer, nonce)`
    pub id: AttestationId,
    /// Subject profile
    pub profile: ProfileId,
    /// Signing issuer
    pub issuer: IssuerId,
    /// Authority key that produced `signature`
    pub issuer_authority: Address,
    /// Issuer kind at registration
    pub kind: IssuerKind,
    /// Commitment to off-chain evidence
    pub payload_hash: Hash32,
    /// Weight contributed while active
    pub weight: u16,
    /// Issue time as signed
    pub issued_at: i64,
    /// Expiry time as signed
    pub expires_at: i64,
    /// Replay key
    pub nonce: u64,
    /// Ed25519 signature over the 146-byte message
    #[serde(with = "signature_bytes")]
    pub signature: [u8; 64],
    /// Optional issuer-side reference
    pub external_id: Option<Hash32>,
    /// Stored status
    pub status: AttestationStatus,
    /// When it was revoked
    pub revoked_at: Option<i64>,
}

impl SignedAttestation {
    /// Status at `now`
    pub fn effective_status(&self, now: i64) -> EffectiveAttestationStatus {
        match self.status {
            AttestationStatus::Revoked => EffectiveAttestationStatus::Revoked,
            AttestationStatus::Active if now >= self.expires_at => {
                EffectiveAttestationStatus::Expired
            }
            AttestationStatus::Active => EffectiveAttestationStatus::Active,
        }
    }

    /// Weight if active at `now`, else zero
    pub fn effective_weight(&self, now: i64) -> u16 {
        match self.effective_status(now) {
            EffectiveAttestationStatus::Active => self.weight,
            _ => 0,
        }
    }
}

// serde derives arrays only up to 32 elements
mod signature_bytes {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &[u8; 64], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_bytes(sig)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 64], D::Error> {
        let bytes: Vec<u8> = Vec::deserialize(d)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| D::Error::invalid_length(v.len(), &"64 bytes"))
    }
}

/// Lightweight pointer kept on the profile for scoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationRef {
    /// Referenced attestation
    pub attestation: AttestationId,
    /// Issuer
    pub issuer: IssuerId,
    /// Issuer kind
    pub kind: IssuerKind,
    /// Weight
    pub weight: u16,
    /// Expiry
    pub expires_at: i64,
    /// Whether the issuer contributes to uniqueness
    pub contributes_to_uniqueness: bool,
}

impl AttestationRef {
    /// Unexpired at `now`
    pub fn is_live(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Per-wallet trust profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanProfile {
    /// Derived from `wallet`
    pub id: ProfileId,
    /// Owning wallet
    pub wallet: Address,
    /// Sum of active weights, capped at 10000
    pub human_score: u16,
    /// Proven unique individual
    pub is_unique: bool,
    /// Score meets the agent registration threshold
    pub can_register_agents: bool,
    /// Active attestations at the last recompute
    pub active_attestation_count: u32,
    /// Attestations ever registered
    pub total_attestation_count: u32,
    /// Non-revoked attestations. Expired entries are pruned on recompute.
    pub attestations: Vec<AttestationRef>,
    /// Creation time
    pub created_at: i64,
    /// Last attestation registration or revocation
    pub last_attestation_at: i64,
    /// Time of the last recompute
    pub last_score_update: i64,
}

impl HumanProfile {
    /// Fresh zero-score profile for `wallet`
    pub fn new(wallet: Address, now: i64) -> Self {
        Self {
            id: ProfileId::derive(&wallet),
            wallet,
            human_score: 0,
            is_unique: false,
            can_register_agents: false,
            active_attestation_count: 0,
            total_attestation_count: 0,
            attestations: Vec::new(),
            created_at: now,
            last_attestation_at: 0,
            last_score_update: now,
        }
    }

    /// Live references at `now`
    pub fn live_attestations(&self, now: i64) -> impl Iterator<Item = &AttestationRef> {
        self.attestations.iter().filter(move |r| r.is_live(now))
    }

    pub(crate) fn remove_attestation(&mut self, id: &AttestationId) -> bool {
        let before = self.attestations.len();
        self.attestations.retain(|r| r.attestation != *id);
        self.attestations.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attestation(expires_at: i64) -> SignedAttestation {
        SignedAttestation {
            id: AttestationId([1; 32]),
            profile: ProfileId([2; 32]),
            issuer: IssuerId([3; 32]),
            issuer_authority: Address([4; 32]),
            kind: IssuerKind::ProofOfPersonhood,
            payload_hash: [5; 32],
            weight: 700,
            issued_at: 0,
            expires_at,
            nonce: 1,
            signature: [6; 64],
            external_id: None,
            status: AttestationStatus::Active,
            revoked_at: None,
        }
    }

    #[test]
    fn test_expiry_is_computed() {
        let att = attestation(100);
        assert_eq!(att.effective_status(99), EffectiveAttestationStatus::Active);
        assert_eq!(att.effective_status(100), EffectiveAttestationStatus::Expired);
        assert_eq!(att.effective_weight(100), 0);
        assert_eq!(att.status, AttestationStatus::Active);
    }

    #[test]
    fn test_revoked_wins_over_expired() {
        let mut att = attestation(100);
        att.status = AttestationStatus::Revoked;
        assert_eq!(att.effective_status(500), EffectiveAttestationStatus::Revoked);
        assert_eq!(att.effective_weight(50), 0);
    }

    #[test]
    fn test_profile_id_matches_wallet() {
        let wallet = Address([8; 32]);
        let profile = HumanProfile::new(wallet, 10);
        assert_eq!(profile.id, ProfileId::derive(&wallet));
        assert_eq!(profile.human_score, 0);
    }
}
