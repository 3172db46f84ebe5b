//! Builders for issuers, attestations, capabilities and receipts

use crate::keys::KeyTestFixture;
use humanrail_attestation::{
    AttestationParams, AttestationVerifier, IssuerKind, RegisterIssuerParams,
};
use humanrail_core::scope::{asset, program};
use humanrail_core::{
    ActionKind, Address, AgentId, CapabilityId, IssuerId, ProfileId, SECONDS_PER_DAY,
};
use humanrail_delegation::{IssueCapabilityParams, RegisterAgentParams, UsageParams};
use humanrail_receipts::EmitReceiptParams;

/// Issuer registration for `key`
pub fn issuer_params(
    key: &KeyTestFixture,
    kind: IssuerKind,
    max_weight: u16,
    contributes_to_uniqueness: bool,
) -> RegisterIssuerParams {
    RegisterIssuerParams {
        authority: key.address(),
        name: format!("{kind:?} issuer"),
        kind,
        max_weight,
        contributes_to_uniqueness,
        default_validity: None,
        metadata_uri: None,
    }
}

/// Attestation fields with a one-year explicit expiry
pub fn attestation_params(weight: u16, issued_at: i64, nonce: u64) -> AttestationParams {
    AttestationParams {
        payload_hash: [weight as u8; 32],
        weight,
        issued_at,
        expires_at: Some(issued_at + 365 * SECONDS_PER_DAY),
        nonce,
        external_id: None,
    }
}

/// Sign `params` as the issuer authority `key`.
pub fn sign_attestation(
    verifier: &AttestationVerifier,
    key: &KeyTestFixture,
    profile: &ProfileId,
    issuer: &IssuerId,
    params: &AttestationParams,
) -> [u8; 64] {
    let message = verifier
        .signing_message(profile, issuer, params)
        .unwrap_or_else(|err| panic!("signing message for unknown issuer: {err}"));
    key.sign(&message.encode())
}

/// Agent registration with the given signing key
pub fn agent_params(signing_key: Address, nonce: u64) -> RegisterAgentParams {
    RegisterAgentParams {
        signing_key,
        name: format!("agent-{nonce}"),
        metadata_hash: [0; 32],
        tee_measurement: None,
        nonce,
    }
}

/// Fluent builder for [`IssueCapabilityParams`]
#[derive(Debug, Clone)]
pub struct CapabilityBuilder {
    params: IssueCapabilityParams,
}

impl CapabilityBuilder {
    /// Unrestricted scope, 100/1000/10000 limits, valid for 30 days from `now`
    pub fn new(agent: AgentId, now: i64) -> Self {
        Self {
            params: IssueCapabilityParams {
                agent,
                allowed_programs: program::ALL,
                allowed_assets: asset::ALL,
                per_tx_limit: 100,
                daily_limit: 1_000,
                total_limit: 10_000,
                max_slippage_bps: 100,
                max_fee: 1_000,
                valid_from: now,
                expires_at: now + 30 * SECONDS_PER_DAY,
                cooldown_seconds: 0,
                risk_tier: 1,
                destination_allowlist: Vec::new(),
                nonce: 0,
            },
        }
    }

    /// Set per-tx, daily and total limits
    pub fn limits(mut self, per_tx: u64, daily: u64, total: u64) -> Self {
        self.params.per_tx_limit = per_tx;
        self.params.daily_limit = daily;
        self.params.total_limit = total;
        self
    }

    /// Restrict program and asset scope
    pub fn scope(mut self, programs: u64, assets: u64) -> Self {
        self.params.allowed_programs = programs;
        self.params.allowed_assets = assets;
        self
    }

    /// Enforce a destination allowlist
    pub fn allowlist(mut self, destinations: Vec<Address>) -> Self {
        self.params.destination_allowlist = destinations;
        self
    }

    /// Set the cooldown
    pub fn cooldown(mut self, seconds: u32) -> Self {
        self.params.cooldown_seconds = seconds;
        self
    }

    /// Set the validity window
    pub fn window(mut self, valid_from: i64, expires_at: i64) -> Self {
        self.params.valid_from = valid_from;
        self.params.expires_at = expires_at;
        self
    }

    /// Set the risk tier
    pub fn risk_tier(mut self, tier: u8) -> Self {
        self.params.risk_tier = tier;
        self
    }

    /// Set the nonce
    pub fn nonce(mut self, nonce: u64) -> Self {
        self.params.nonce = nonce;
        self
    }

    /// Finished parameters
    pub fn build(self) -> IssueCapabilityParams {
        self.params
    }
}

/// Payment usage of `amount` by `agent`
pub fn payment(agent: AgentId, amount: u64) -> UsageParams {
    UsageParams {
        agent,
        amount,
        action: ActionKind::Payment,
        destination: None,
        tx_ref: [0; 32],
    }
}

/// Receipt for a payment of `value`
pub fn receipt_params(
    principal: Address,
    agent: AgentId,
    capability: CapabilityId,
    value: u64,
    nonce: u64,
) -> EmitReceiptParams {
    EmitReceiptParams {
        principal,
        agent,
        capability,
        action_hash: [1; 32],
        result_hash: [2; 32],
        action: ActionKind::Payment,
        value,
        destination: None,
        offchain_ref: None,
        nonce,
    }
}
