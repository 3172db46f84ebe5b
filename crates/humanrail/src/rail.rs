//! The assembled engine
//!
//! [`HumanRail`] owns one instance of every registry and wires the seams
//! between them: agent registration reads human scores from the attestation
//! verifier, the capability engine consults the shared freeze registry, the
//! dispute ledger works on the engine's capability store, and receipt
//! emission is gated on the agent's signing key.

use humanrail_attestation::{AttestationVerifier, IssuerRegistry};
use humanrail_core::{Address, AgentId, RailConfig, RailError, RailResult};
use humanrail_delegation::{
    AgentRegistry, CapabilityEngine, DisputeLedger, FreezeRegistry, RegisterAgentParams,
};
use humanrail_receipts::{ActionReceipt, BatchSummary, EmitReceiptParams, ReceiptLedger};
use std::path::Path;
use std::sync::Arc;

/// Every HumanRail registry behind one handle
#[derive(Debug)]
pub struct HumanRail {
    config: RailConfig,
    attestations: AttestationVerifier,
    agents: Arc<AgentRegistry>,
    capabilities: CapabilityEngine,
    disputes: DisputeLedger,
    receipts: ReceiptLedger,
}

impl HumanRail {
    /// Engine with issuer administration granted to `admin`.
    pub fn new(admin: Address, config: RailConfig) -> RailResult<Self> {
        config.validate()?;
        let issuers = Arc::new(IssuerRegistry::new(admin, config.trust.clone()));
        let agents = Arc::new(AgentRegistry::new(&config.trust, &config.agents));
        let freezes = Arc::new(FreezeRegistry::new());
        let capabilities =
            CapabilityEngine::new(config.delegation.clone(), Arc::clone(&agents), freezes);
        let disputes = DisputeLedger::new(capabilities.store());

        tracing::info!(admin = %admin, "humanrail engine started");
        Ok(Self {
            attestations: AttestationVerifier::new(issuers, config.trust.clone()),
            receipts: ReceiptLedger::new(config.receipts.clone()),
            config,
            agents,
            capabilities,
            disputes,
        })
    }

    /// Engine configured from a TOML file overlaid with `HUMANRAIL_*` variables.
    pub fn from_config_file(admin: Address, path: &Path) -> RailResult<Self> {
        let mut config = RailConfig::load_from_file(path)?;
        config.merge_with_env()?;
        Self::new(admin, config)
    }

    /// Active configuration
    pub fn config(&self) -> &RailConfig {
        &self.config
    }

    /// Issuer registry
    pub fn issuers(&self) -> &IssuerRegistry {
        self.attestations.issuers()
    }

    /// Profiles, attestations and scoring
    pub fn attestations(&self) -> &AttestationVerifier {
        &self.attestations
    }

    /// Agent registry
    pub fn agents(&self) -> &AgentRegistry {
        &self.agents
    }

    /// Capability issuance, validation and usage
    pub fn capabilities(&self) -> &CapabilityEngine {
        &self.capabilities
    }

    /// Freeze registry
    pub fn freezes(&self) -> &FreezeRegistry {
        self.capabilities.freezes()
    }

    /// Dispute ledger
    pub fn disputes(&self) -> &DisputeLedger {
        &self.disputes
    }

    /// Receipt ledger
    pub fn receipts(&self) -> &ReceiptLedger {
        &self.receipts
    }

    /// Register an agent, gated on `principal`'s current human score.
    pub fn register_agent(
        &self,
        principal: &Address,
        params: RegisterAgentParams,
        now: i64,
    ) -> RailResult<AgentId> {
        self.agents
            .register_agent(principal, params, &self.attestations, now)
    }

    /// The agent must be active and belong to `principal`, and `emitter` must
    /// be one of its signing keys.
    fn authorize_emitter(
        &self,
        emitter: &Address,
        principal: &Address,
        agent: &AgentId,
        now: i64,
    ) -> RailResult<()> {
        let profile = self.agents.get(agent)?;
        if profile.owner != *principal {
            tracing::warn!(agent = %agent, principal = %principal, "receipt principal does not own agent");
            return Err(RailError::unauthorized(
                "agent is not owned by the stated principal",
            ));
        }
        if !profile.is_active() {
            return Err(RailError::AgentNotActive);
        }
        self.agents.authorize_signer(agent, emitter, now)
    }

    /// Emit a receipt signed off by the agent key `emitter`.
    pub fn emit_receipt(
        &self,
        emitter: &Address,
        params: EmitReceiptParams,
        now: i64,
    ) -> RailResult<ActionReceipt> {
        self.authorize_emitter(emitter, &params.principal, &params.agent, now)?;
        let receipt = self.receipts.emit(params, now)?;
        self.agents.record_action(&receipt.agent)?;
        Ok(receipt)
    }

    /// Emit a batch of receipts, all signed off by `emitter`.
    ///
    /// Authorization is checked for every entry before the ledger sees the batch.
    pub fn emit_receipt_batch(
        &self,
        emitter: &Address,
        batch: Vec<EmitReceiptParams>,
        now: i64,
    ) -> RailResult<(BatchSummary, Vec<ActionReceipt>)> {
        for params in &batch {
            self.authorize_emitter(emitter, &params.principal, &params.agent, now)?;
        }
        let (summary, receipts) = self.receipts.emit_batch(batch, now)?;
        for receipt in &receipts {
            self.agents.record_action(&receipt.agent)?;
        }
        Ok((summary, receipts))
    }
}
