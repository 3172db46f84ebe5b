//! Attestation verification and registration
//!
//! [`AttestationVerifier`] owns profiles and attestation records. A signed
//! attestation is accepted only if the issuer's authority signed the exact
//! 146-byte message rebuilt from the caller-declared fields, so any tampered
//! field surfaces as [`RailError::SignatureInvalid`].
//!
//! Registration and revocation hold the profile's lock for the whole
//! check-then-write sequence, which makes nonce replay rejection race-free per
//! `(profile, issuer)`.

use crate::codec::AttestationMessage;
use crate::issuer::{Issuer, IssuerRegistry};
use crate::profile::{AttestationRef, AttestationStatus, HumanProfile, SignedAttestation};
use crate::trust_score::{HumanRequirements, HumanVerification, TrustScoreEngine};
use humanrail_core::config::TrustConfig;
use humanrail_core::crypto::verify_ed25519;
use humanrail_core::{
    Address, AttestationId, Hash32, HumanScoreSource, IssuerId, KeyedArena, ProfileId, RailError,
    RailResult,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Alias kept for call sites that name the attestation error domain
pub type AttestationError = RailError;

/// Caller-declared attestation fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestationParams {
    /// Commitment to off-chain evidence
    pub payload_hash: Hash32,
    /// Asserted weight
    pub weight: u16,
    /// Issue time as signed
    pub issued_at: i64,
    /// Expiry as signed; `None` means `issued_at + issuer.default_validity`
    pub expires_at: Option<i64>,
    /// Replay key
    pub nonce: u64,
    /// Optional issuer-side reference
    pub external_id: Option<Hash32>,
}

/// Profiles, attestation records and the scoring engine
#[derive(Debug)]
pub struct AttestationVerifier {
    issuers: Arc<IssuerRegistry>,
    profiles: KeyedArena<ProfileId, HumanProfile>,
    attestations: KeyedArena<AttestationId, SignedAttestation>,
    trust: TrustScoreEngine,
}

impl AttestationVerifier {
    /// Verifier backed by `issuers`
    pub fn new(issuers: Arc<IssuerRegistry>, config: TrustConfig) -> Self {
        Self {
            issuers,
            profiles: KeyedArena::new(),
            attestations: KeyedArena::new(),
            trust: TrustScoreEngine::new(config),
        }
    }

    /// Issuer registry in use
    pub fn issuers(&self) -> &IssuerRegistry {
        &self.issuers
    }

    /// Scoring engine in use
    pub fn trust_engine(&self) -> &TrustScoreEngine {
        &self.trust
    }

    /// Create the profile owned by `wallet`.
    pub fn init_profile(&self, wallet: &Address, now: i64) -> RailResult<ProfileId> {
        let profile = HumanProfile::new(*wallet, now);
        let id = profile.id;
        self.profiles
            .insert_new(id, profile)
            .map_err(|_| RailError::ProfileAlreadyExists)?;
        tracing::info!(profile = %id, wallet = %wallet, "profile created");
        Ok(id)
    }

    fn resolve_expiry(issuer: &Issuer, params: &AttestationParams) -> i64 {
        params
            .expires_at
            .unwrap_or_else(|| params.issued_at.saturating_add(issuer.default_validity))
    }

    /// The message an issuer must sign for these parameters.
    pub fn signing_message(
        &self,
        profile: &ProfileId,
        issuer: &IssuerId,
        params: &AttestationParams,
    ) -> RailResult<AttestationMessage> {
        let issuer = self.issuers.get(issuer)?;
        Ok(AttestationMessage {
            profile: *profile,
            issuer: issuer.id,
            payload_hash: params.payload_hash,
            weight: params.weight,
            issued_at: params.issued_at,
            expires_at: Self::resolve_expiry(&issuer, params),
            nonce: params.nonce,
        })
    }

    /// Verify a signed attestation and register it against the profile.
    ///
    /// On success the profile score is recomputed. On any error nothing is
    /// written.
    pub fn verify_and_register(
        &self,
        profile: &ProfileId,
        issuer_id: &IssuerId,
        params: AttestationParams,
        signature: &[u8; 64],
        signer: &Address,
        now: i64,
    ) -> RailResult<AttestationId> {
        let issuer = self.issuers.get(issuer_id)?;
        if !issuer.is_active() {
            return Err(RailError::IssuerNotActive);
        }

        let expires_at = Self::resolve_expiry(&issuer, &params);
        let message = AttestationMessage {
            profile: *profile,
            issuer: issuer.id,
            payload_hash: params.payload_hash,
            weight: params.weight,
            issued_at: params.issued_at,
            expires_at,
            nonce: params.nonce,
        };

        if *signer != issuer.authority {
            tracing::warn!(issuer = %issuer.id, signer = %signer, "attestation signer is not issuer authority");
            return Err(RailError::SignatureInvalid);
        }
        if let Err(err) = verify_ed25519(signer, &message.encode(), signature) {
            tracing::warn!(issuer = %issuer.id, profile = %profile, "attestation signature rejected");
            return Err(err);
        }

        if params.weight == 0 {
            return Err(RailError::InvalidWeight { weight: 0 });
        }
        if params.weight > issuer.max_weight {
            return Err(RailError::WeightExceedsIssuerCap {
                weight: params.weight,
                max_weight: issuer.max_weight,
            });
        }

        let id = AttestationId::derive(profile, issuer_id, params.nonce);
        let max_active = self.trust.config().max_attestations_per_profile;

        let (score, is_unique) = self
            .profiles
            .with_mut(profile, |p| -> RailResult<(u16, bool)> {
                if self.attestations.contains(&id) {
                    tracing::warn!(profile = %profile, issuer = %issuer_id, nonce = params.nonce, "replayed attestation nonce");
                    return Err(RailError::ReplayedNonce {
                        nonce: params.nonce,
                    });
                }
                if expires_at <= params.issued_at {
                    return Err(RailError::InvalidValidityWindow);
                }
                if expires_at <= now {
                    return Err(RailError::InvalidExpiry);
                }
                if self.trust.compute(p, now).active_attestations as usize >= max_active {
                    return Err(RailError::TooManyAttestations);
                }

                let record = SignedAttestation {
                    id,
                    profile: *profile,
                    issuer: issuer.id,
                    issuer_authority: issuer.authority,
                    kind: issuer.kind,
                    payload_hash: params.payload_hash,
                    weight: params.weight,
                    issued_at: params.issued_at,
                    expires_at,
                    nonce: params.nonce,
                    signature: *signature,
                    external_id: params.external_id,
                    status: AttestationStatus::Active,
                    revoked_at: None,
                };
                self.attestations
                    .insert_new(id, record)
                    .map_err(|_| RailError::ReplayedNonce {
                        nonce: params.nonce,
                    })?;

                p.attestations.push(AttestationRef {
                    attestation: id,
                    issuer: issuer.id,
                    kind: issuer.kind,
                    weight: params.weight,
                    expires_at,
                    contributes_to_uniqueness: issuer.contributes_to_uniqueness,
                });
                p.total_attestation_count = p.total_attestation_count.saturating_add(1);
                p.last_attestation_at = now;
                Ok(self.trust.recompute(p, now))
            })
            .ok_or(RailError::ProfileNotFound)??;

        self.issuers.record_issued(issuer_id);
        tracing::info!(
            attestation = %id,
            profile = %profile,
            issuer = %issuer_id,
            weight = params.weight,
            score,
            is_unique,
            "attestation registered"
        );
        Ok(id)
    }

    /// Revoke an attestation. The caller must be the issuer authority or the
    /// profile's wallet. Returns the recomputed `(score, is_unique)`.
    ///
    /// The nonce stays consumed, so the same attestation cannot be replayed.
    pub fn revoke_attestation(
        &self,
        caller: &Address,
        id: &AttestationId,
        now: i64,
    ) -> RailResult<(u16, bool)> {
        let attestation = self.attestation(id)?;
        let issuer = self.issuers.get(&attestation.issuer)?;
        let wallet = self
            .profiles
            .with(&attestation.profile, |p| p.wallet)
            .ok_or(RailError::ProfileNotFound)?;

        let by_issuer = *caller == issuer.authority;
        if !by_issuer && *caller != wallet {
            tracing::warn!(attestation = %id, caller = %caller, "unauthorized attestation revocation");
            return Err(RailError::unauthorized(
                "caller is neither the issuer authority nor the profile owner",
            ));
        }

        let result = self
            .profiles
            .with_mut(&attestation.profile, |p| -> RailResult<(u16, bool)> {
                self.attestations
                    .with_mut(id, |a| {
                        if a.status == AttestationStatus::Revoked {
                            return Err(RailError::AttestationAlreadyRevoked);
                        }
                        a.status = AttestationStatus::Revoked;
                        a.revoked_at = Some(now);
                        Ok(())
                    })
                    .ok_or(RailError::AttestationNotFound)??;
                p.remove_attestation(id);
                p.last_attestation_at = now;
                Ok(self.trust.recompute(p, now))
            })
            .ok_or(RailError::ProfileNotFound)??;

        self.issuers.record_revoked(&attestation.issuer);
        tracing::info!(
            attestation = %id,
            by_issuer,
            score = result.0,
            is_unique = result.1,
            "attestation revoked"
        );
        Ok(result)
    }

    /// Recompute a profile's score at `now`.
    pub fn recompute(&self, profile: &ProfileId, now: i64) -> RailResult<(u16, bool)> {
        self.profiles
            .with_mut(profile, |p| self.trust.recompute(p, now))
            .ok_or(RailError::ProfileNotFound)
    }

    /// Profile snapshot, recomputed at `now` so expiry is never overstated.
    pub fn profile(&self, id: &ProfileId, now: i64) -> RailResult<HumanProfile> {
        self.profiles
            .with_mut(id, |p| {
                self.trust.recompute(p, now);
                p.clone()
            })
            .ok_or(RailError::ProfileNotFound)
    }

    /// Profile owned by `wallet`, recomputed at `now`.
    pub fn profile_by_wallet(&self, wallet: &Address, now: i64) -> RailResult<HumanProfile> {
        self.profile(&ProfileId::derive(wallet), now)
    }

    /// Check a profile against `requirements` at `now`.
    pub fn verify_human(
        &self,
        profile: &ProfileId,
        requirements: &HumanRequirements,
        now: i64,
    ) -> RailResult<HumanVerification> {
        let snapshot = self.profile(profile, now)?;
        let outcome = self.trust.verify(&snapshot, requirements, now);
        tracing::debug!(
            profile = %profile,
            score = snapshot.human_score,
            passed = outcome.is_ok(),
            "human verified"
        );
        outcome
    }

    /// Attestation record
    pub fn attestation(&self, id: &AttestationId) -> RailResult<SignedAttestation> {
        self.attestations.get(id).ok_or(RailError::AttestationNotFound)
    }

    /// Every attestation ever registered for `profile`, revoked and expired included
    pub fn attestations_for_profile(&self, profile: &ProfileId) -> Vec<SignedAttestation> {
        let mut out = self.attestations.filter_cloned(|a| a.profile == *profile);
        out.sort_by_key(|a| (a.issued_at, a.nonce));
        out
    }
}

impl HumanScoreSource for AttestationVerifier {
    fn human_score(&self, wallet: &Address, now: i64) -> Option<u16> {
        self.profile_by_wallet(wallet, now)
            .ok()
            .map(|p| p.human_score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issuer::{IssuerKind, RegisterIssuerParams};
    use ed25519_dalek::{Signer, SigningKey};

    const ADMIN: Address = Address([9; 32]);
    const WALLET: Address = Address([1; 32]);
    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        verifier: AttestationVerifier,
        key: SigningKey,
        issuer: IssuerId,
        profile: ProfileId,
    }

    fn fixture(max_attestations_per_profile: usize) -> Fixture {
        let config = TrustConfig {
            max_attestations_per_profile,
            ..TrustConfig::default()
        };
        let issuers = Arc::new(IssuerRegistry::new(ADMIN, config.clone()));
        let key = SigningKey::from_bytes(&[7; 32]);
        let issuer = issuers
            .register_issuer(
                &ADMIN,
                RegisterIssuerParams {
                    authority: Address(key.verifying_key().to_bytes()),
                    name: "device".into(),
                    kind: IssuerKind::DeviceBased,
                    max_weight: 100,
                    contributes_to_uniqueness: false,
                    default_validity: None,
                    metadata_uri: None,
                },
                NOW,
            )
            .unwrap();
        let verifier = AttestationVerifier::new(issuers, config);
        let profile = verifier.init_profile(&WALLET, NOW).unwrap();
        Fixture {
            verifier,
            key,
            issuer,
            profile,
        }
    }

    fn submit(f: &Fixture, nonce: u64, now: i64) -> RailResult<AttestationId> {
        let params = AttestationParams {
            payload_hash: [3; 32],
            weight: 10,
            issued_at: now,
            expires_at: Some(now + 1_000),
            nonce,
            external_id: None,
        };
        let message = f
            .verifier
            .signing_message(&f.profile, &f.issuer, &params)
            .unwrap();
        let signature = f.key.sign(&message.encode()).to_bytes();
        let signer = Address(f.key.verifying_key().to_bytes());
        f.verifier
            .verify_and_register(&f.profile, &f.issuer, params, &signature, &signer, now)
    }

    #[test]
    fn test_rejected_registration_leaves_profile_untouched() {
        let f = fixture(2);
        submit(&f, 0, NOW).unwrap();
        submit(&f, 1, NOW).unwrap();
        let before = f.verifier.profiles.get(&f.profile).unwrap();

        assert_eq!(submit(&f, 2, NOW + 50), Err(RailError::TooManyAttestations));
        assert_eq!(f.verifier.profiles.get(&f.profile).unwrap(), before);
        assert_eq!(before.last_score_update, NOW);
        assert!(f.verifier.attestation(&AttestationId::derive(&f.profile, &f.issuer, 2)).is_err());
    }

    #[test]
    fn test_expired_attestations_free_cap_slots() {
        let f = fixture(2);
        submit(&f, 0, NOW).unwrap();
        submit(&f, 1, NOW).unwrap();
        assert_eq!(submit(&f, 2, NOW + 999), Err(RailError::TooManyAttestations));

        // both earlier attestations lapse at NOW + 1000
        submit(&f, 2, NOW + 1_000).unwrap();
        let profile = f.verifier.profiles.get(&f.profile).unwrap();
        assert_eq!(profile.attestations.len(), 1);
        assert_eq!(profile.total_attestation_count, 3);
    }
}
