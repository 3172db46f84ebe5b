//! Trust score aggregation
//!
//! `human_score` is the sum of weights of every active, unexpired attestation,
//! clamped to 10000. `is_unique` is decided separately: only weight from
//! issuers flagged `contributes_to_uniqueness` counts, and it must exceed the
//! uniqueness threshold.
//!
//! Scores are recomputed eagerly on every registration and revocation, and
//! again at read time so natural expiry is reflected without a sweep.

use crate::issuer::IssuerKind;
use crate::profile::HumanProfile;
use humanrail_core::config::{TrustConfig, MAX_HUMAN_SCORE};
use humanrail_core::{RailError, RailResult};
use serde::{Deserialize, Serialize};

/// Context flags returned by [`TrustScoreEngine::verify`]
pub mod flags {
    /// Proven unique individual
    pub const IS_UNIQUE: u64 = 1 << 0;
    /// Score meets the agent registration threshold
    pub const CAN_REGISTER_AGENTS: u64 = 1 << 1;
    /// Holds a live KYC attestation
    pub const HAS_KYC: u64 = 1 << 2;
    /// Holds a live proof-of-personhood attestation
    pub const HAS_POP: u64 = 1 << 3;
}

/// Aggregate over a profile's live attestations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustScore {
    /// Clamped weight sum
    pub score: u16,
    /// Uniqueness decision
    pub is_unique: bool,
    /// Live attestation count
    pub active_attestations: u32,
    /// Raw uniqueness-contributing weight
    pub uniqueness_weight: u32,
}

/// Requirements a caller places on a human
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanRequirements {
    /// Minimum effective score
    pub min_score: Option<u16>,
    /// Must be unique
    pub require_unique: bool,
    /// Minimum live attestations
    pub min_attestations: Option<u32>,
    /// Must meet the agent registration threshold
    pub require_can_register_agents: bool,
}

impl HumanRequirements {
    /// Require the configured "verified human" score
    pub fn verified(config: &TrustConfig) -> Self {
        Self {
            min_score: Some(config.verified_score_threshold),
            ..Self::default()
        }
    }
}

/// Outcome of a successful human verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HumanVerification {
    /// Effective score at evaluation time
    pub score: u16,
    /// Live attestations
    pub active_attestations: u32,
    /// Bitwise OR of [`flags`]
    pub context_flags: u64,
}

impl HumanVerification {
    /// Whether a flag bit is set
    pub fn has_flag(&self, flag: u64) -> bool {
        self.context_flags & flag == flag
    }
}

/// Score aggregation rules
#[derive(Debug, Clone, Default)]
pub struct TrustScoreEngine {
    config: TrustConfig,
}

impl TrustScoreEngine {
    /// Engine with the given thresholds
    pub fn new(config: TrustConfig) -> Self {
        Self { config }
    }

    /// Thresholds in use
    pub fn config(&self) -> &TrustConfig {
        &self.config
    }

    /// Aggregate without mutating the profile.
    pub fn compute(&self, profile: &HumanProfile, now: i64) -> TrustScore {
        let mut total: u32 = 0;
        let mut uniqueness_weight: u32 = 0;
        let mut active: u32 = 0;
        for r in profile.live_attestations(now) {
            total = total.saturating_add(u32::from(r.weight));
            if r.contributes_to_uniqueness {
                uniqueness_weight = uniqueness_weight.saturating_add(u32::from(r.weight));
            }
            active += 1;
        }
        let score = total.min(u32::from(MAX_HUMAN_SCORE)) as u16;
        TrustScore {
            score,
            is_unique: uniqueness_weight > u32::from(self.config.uniqueness_threshold),
            active_attestations: active,
            uniqueness_weight,
        }
    }

    /// Recompute and store the profile's score at `now`, pruning expired references.
    pub fn recompute(&self, profile: &mut HumanProfile, now: i64) -> (u16, bool) {
        let result = self.compute(profile, now);
        profile.attestations.retain(|r| r.is_live(now));
        let changed = profile.human_score != result.score || profile.is_unique != result.is_unique;
        profile.human_score = result.score;
        profile.is_unique = result.is_unique;
        profile.active_attestation_count = result.active_attestations;
        profile.can_register_agents = result.score >= self.config.min_agent_score;
        profile.last_score_update = now;
        if changed {
            tracing::debug!(
                profile = %profile.id,
                score = result.score,
                is_unique = result.is_unique,
                "human score recomputed"
            );
        }
        (result.score, result.is_unique)
    }

    /// Check `requirements` against the profile's live state at `now`.
    ///
    /// Checks run in order: score, uniqueness, attestation count, agent
    /// eligibility. The first unmet requirement is returned.
    pub fn verify(
        &self,
        profile: &HumanProfile,
        requirements: &HumanRequirements,
        now: i64,
    ) -> RailResult<HumanVerification> {
        let result = self.compute(profile, now);
        let can_register_agents = result.score >= self.config.min_agent_score;

        let mut context_flags = 0;
        if result.is_unique {
            context_flags |= flags::IS_UNIQUE;
        }
        if can_register_agents {
            context_flags |= flags::CAN_REGISTER_AGENTS;
        }
        for r in profile.live_attestations(now) {
            match r.kind {
                IssuerKind::KycProvider => context_flags |= flags::HAS_KYC,
                IssuerKind::ProofOfPersonhood => context_flags |= flags::HAS_POP,
                _ => {}
            }
        }

        if let Some(required) = requirements.min_score {
            if result.score < required {
                return Err(RailError::InsufficientHumanScore {
                    score: result.score,
                    required,
                });
            }
        }
        if requirements.require_unique && !result.is_unique {
            return Err(RailError::NotUnique);
        }
        if let Some(required) = requirements.min_attestations {
            if result.active_attestations < required {
                return Err(RailError::InsufficientAttestations {
                    active: result.active_attestations,
                    required,
                });
            }
        }
        if requirements.require_can_register_agents && !can_register_agents {
            return Err(RailError::InsufficientHumanScore {
                score: result.score,
                required: self.config.min_agent_score,
            });
        }

        Ok(HumanVerification {
            score: result.score,
            active_attestations: result.active_attestations,
            context_flags,
        })
    }
}
