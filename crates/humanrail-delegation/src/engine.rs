//! Capability engine
//!
//! Issues and revokes capabilities, answers `validate` against a snapshot, and
//! commits spend through `record_usage`. All writes to one capability go
//! through its arena slot, so concurrent recorders against the same capability
//! cannot jointly exceed a limit.

use crate::agent::{AgentRegistry, AgentStatus};
use crate::capability::{
    validate_capability, ActionRequest, Capability, CapabilityStatus, CapabilityStore,
    IssueCapabilityParams, RevocationEntry, UsageParams, UsageRecord, ValidationOutcome,
};
use crate::freeze::{FreezeRecord, FreezeRegistry};
use humanrail_core::config::DelegationConfig;
use humanrail_core::{
    Address, AgentId, CapabilityId, Hash32, KeyedArena, RailError, RailResult, UsageId,
};
use std::sync::Arc;

/// Capability issuance, validation and usage accounting
#[derive(Debug)]
pub struct CapabilityEngine {
    config: DelegationConfig,
    agents: Arc<AgentRegistry>,
    freezes: Arc<FreezeRegistry>,
    capabilities: Arc<CapabilityStore>,
    usage: KeyedArena<CapabilityId, Vec<UsageRecord>>,
    revocations: KeyedArena<CapabilityId, RevocationEntry>,
}

impl CapabilityEngine {
    /// Engine over a fresh capability store
    pub fn new(
        config: DelegationConfig,
        agents: Arc<AgentRegistry>,
        freezes: Arc<FreezeRegistry>,
    ) -> Self {
        Self {
            config,
            agents,
            freezes,
            capabilities: Arc::new(CapabilityStore::new()),
            usage: KeyedArena::new(),
            revocations: KeyedArena::new(),
        }
    }

    /// Shared capability store, for the dispute ledger
    pub fn store(&self) -> Arc<CapabilityStore> {
        Arc::clone(&self.capabilities)
    }

    /// Freeze registry consulted by `validate` and `record_usage`
    pub fn freezes(&self) -> &FreezeRegistry {
        &self.freezes
    }

    /// Issue a capability from `principal` to `params.agent`.
    pub fn issue_capability(
        &self,
        principal: &Address,
        params: IssueCapabilityParams,
        now: i64,
    ) -> RailResult<CapabilityId> {
        params.validate(&self.config, now)?;
        let agent = self.agents.get(&params.agent)?;
        if agent.status == AgentStatus::Revoked {
            return Err(RailError::AgentRevoked);
        }

        let capability = params.into_capability(*principal, now);
        let id = capability.id;
        let agent_id = capability.agent;
        let (daily_limit, total_limit, expires_at) = (
            capability.daily_limit,
            capability.total_limit,
            capability.expires_at,
        );
        self.capabilities
            .insert_new(id, capability)
            .map_err(|_| RailError::CapabilityAlreadyExists)?;
        self.agents.record_capability_issued(&agent_id);

        tracing::info!(
            capability = %id,
            principal = %principal,
            agent = %agent_id,
            daily_limit,
            total_limit,
            expires_at,
            "capability issued"
        );
        Ok(id)
    }

    /// Revoke a capability. Only its issuing principal may do so.
    pub fn revoke_capability(
        &self,
        principal: &Address,
        id: &CapabilityId,
        reason_hash: Hash32,
        now: i64,
    ) -> RailResult<RevocationEntry> {
        let entry = self
            .capabilities
            .with_mut(id, |cap| {
                if cap.principal != *principal {
                    tracing::warn!(capability = %id, caller = %principal, "revocation by non-issuing principal");
                    return Err(RailError::unauthorized(
                        "caller did not issue this capability",
                    ));
                }
                if cap.status == CapabilityStatus::Revoked {
                    return Err(RailError::CapabilityRevoked);
                }
                cap.status = CapabilityStatus::Revoked;
                cap.dispute_reason = None;
                Ok(RevocationEntry {
                    capability: *id,
                    revoked_by: *principal,
                    revoked_at: now,
                    reason_hash,
                })
            })
            .ok_or(RailError::CapabilityNotFound)??;

        // A capability is revoked at most once, so the slot is always fresh.
        let _ = self.revocations.insert_new(*id, entry.clone());
        tracing::info!(capability = %id, "capability revoked");
        Ok(entry)
    }

    /// Check whether `request` is currently authorized under capability `id`.
    ///
    /// Read-only. A success is advisory until `record_usage` commits.
    pub fn validate(
        &self,
        id: &CapabilityId,
        request: &ActionRequest,
        now: i64,
    ) -> RailResult<ValidationOutcome> {
        let capability = self.get(id)?;
        let freeze = self.freezes.record(&capability.principal, &capability.agent);
        let outcome = validate_capability(&capability, freeze.as_ref(), request, now);
        match &outcome {
            Ok(o) => tracing::debug!(
                capability = %id,
                value = request.value,
                remaining_daily = o.remaining_daily,
                remaining_total = o.remaining_total,
                flags = o.context_flags,
                "action validated"
            ),
            Err(err) => tracing::debug!(
                capability = %id,
                value = request.value,
                error = %err,
                "action rejected"
            ),
        }
        outcome
    }

    /// Commit one use of capability `id`.
    ///
    /// Status, agent identity and standing, the principal's freeze and the
    /// limits are re-checked under the capability's lock, so concurrent calls
    /// cannot jointly exceed a ceiling and a freeze placed after `validate`
    /// still blocks the commit. Calls are not deduplicated: two identical
    /// calls record two uses.
    pub fn record_usage(
        &self,
        id: &CapabilityId,
        params: UsageParams,
        now: i64,
    ) -> RailResult<UsageRecord> {
        let record = self
            .capabilities
            .with_mut(id, |cap| -> RailResult<UsageRecord> {
                if cap.agent != params.agent {
                    tracing::warn!(capability = %id, agent = %params.agent, "usage by an agent that does not hold the capability");
                    return Err(RailError::AgentMismatch);
                }
                match cap.status {
                    CapabilityStatus::Active => {}
                    CapabilityStatus::Revoked => return Err(RailError::CapabilityRevoked),
                    CapabilityStatus::Frozen => return Err(RailError::CapabilityFrozen),
                    CapabilityStatus::Disputed => return Err(RailError::CapabilityDisputed),
                }
                self.agents.verify_agent(&cap.agent)?;
                if self.freezes.is_frozen(&cap.principal, &cap.agent) {
                    tracing::warn!(capability = %id, agent = %cap.agent, "usage while agent is frozen");
                    return Err(RailError::AgentFrozen);
                }
                let (daily_spent, total_spent) = check_spend(cap, params.amount, now)?;

                cap.roll_day(now);
                cap.daily_spent = daily_spent;
                cap.total_spent = total_spent;
                cap.use_count += 1;
                cap.last_used_at = now;

                let record = UsageRecord {
                    id: UsageId::derive(id, cap.use_count),
                    capability: *id,
                    agent: params.agent,
                    amount: params.amount,
                    action: params.action,
                    destination: params.destination,
                    used_at: now,
                    tx_ref: params.tx_ref,
                    sequence: cap.use_count,
                };
                self.usage
                    .upsert_with(*id, Vec::new, |records| records.push(record.clone()));
                Ok(record)
            })
            .ok_or(RailError::CapabilityNotFound)??;

        tracing::info!(
            capability = %id,
            agent = %record.agent,
            amount = record.amount,
            sequence = record.sequence,
            "usage recorded"
        );
        Ok(record)
    }

    /// Capability snapshot
    pub fn get(&self, id: &CapabilityId) -> RailResult<Capability> {
        self.capabilities
            .get(id)
            .ok_or(RailError::CapabilityNotFound)
    }

    /// Capabilities issued by `principal`
    pub fn capabilities_of(&self, principal: &Address) -> Vec<Capability> {
        let mut out = self
            .capabilities
            .filter_cloned(|c| c.principal == *principal);
        out.sort_by_key(|c| (c.issued_at, c.nonce));
        out
    }

    /// Capabilities held by `agent`
    pub fn capabilities_for_agent(&self, agent: &AgentId) -> Vec<Capability> {
        let mut out = self.capabilities.filter_cloned(|c| c.agent == *agent);
        out.sort_by_key(|c| (c.issued_at, c.nonce));
        out
    }

    /// Usage history of a capability, in sequence order
    pub fn usage_records(&self, id: &CapabilityId) -> Vec<UsageRecord> {
        self.usage.get(id).unwrap_or_default()
    }

    /// Revocation entry, if the capability was revoked directly
    pub fn revocation(&self, id: &CapabilityId) -> Option<RevocationEntry> {
        self.revocations.get(id)
    }

    /// Freeze the capability's agent for its issuing principal.
    pub fn freeze(
        &self,
        principal: &Address,
        id: &CapabilityId,
        agent: &AgentId,
        reason_hash: Hash32,
        now: i64,
    ) -> RailResult<FreezeRecord> {
        let capability = self.get(id)?;
        self.freezes
            .freeze(principal, &capability, agent, reason_hash, now)
    }

    /// Lift a freeze placed through [`Self::freeze`].
    pub fn unfreeze(
        &self,
        principal: &Address,
        id: &CapabilityId,
        agent: &AgentId,
        now: i64,
    ) -> RailResult<FreezeRecord> {
        let capability = self.get(id)?;
        self.freezes.unfreeze(principal, &capability, agent, now)
    }
}

/// Limit checks for committing `amount` at `now`, against the rolled-over daily
/// window. Returns the daily and total spend after the commit.
fn check_spend(cap: &Capability, amount: u64, now: i64) -> RailResult<(u64, u64)> {
    if amount > cap.per_tx_limit {
        return Err(RailError::PerTxLimitExceeded {
            requested: amount,
            limit: cap.per_tx_limit,
        });
    }
    let daily_spent = cap.effective_daily_spent(now);
    let new_daily = match daily_spent.checked_add(amount) {
        Some(sum) if sum <= cap.daily_limit => sum,
        _ => {
            return Err(RailError::DailyLimitExceeded {
                requested: amount,
                remaining: cap.daily_limit.saturating_sub(daily_spent),
            })
        }
    };
    let new_total = match cap.total_spent.checked_add(amount) {
        Some(sum) if sum <= cap.total_limit => sum,
        _ => {
            return Err(RailError::TotalLimitExceeded {
                requested: amount,
                remaining: cap.total_limit.saturating_sub(cap.total_spent),
            })
        }
    };
    Ok((new_daily, new_total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RegisterAgentParams;
    use humanrail_core::config::{AgentConfig, TrustConfig};
    use humanrail_core::scope::{asset, program};
    use humanrail_core::{day_number, ActionKind, SECONDS_PER_DAY};
    use std::collections::HashMap;

    const ALICE: Address = Address([1; 32]);
    const NOW: i64 = 1_700_000_000;

    struct Fixture {
        engine: CapabilityEngine,
        agent: AgentId,
    }

    fn fixture() -> Fixture {
        let agents = Arc::new(AgentRegistry::new(
            &TrustConfig::default(),
            &AgentConfig::default(),
        ));
        let agent = agents
            .register_agent(
                &ALICE,
                RegisterAgentParams {
                    signing_key: Address([2; 32]),
                    name: "bot".into(),
                    metadata_hash: [0; 32],
                    tee_measurement: None,
                    nonce: 0,
                },
                &HashMap::from([(ALICE, 100u16)]),
                NOW,
            )
            .unwrap();
        let engine = CapabilityEngine::new(
            DelegationConfig::default(),
            agents,
            Arc::new(FreezeRegistry::new()),
        );
        Fixture { engine, agent }
    }

    fn params(agent: AgentId, daily: u64) -> IssueCapabilityParams {
        IssueCapabilityParams {
            agent,
            allowed_programs: program::ALL,
            allowed_assets: asset::ALL,
            per_tx_limit: daily,
            daily_limit: daily,
            total_limit: daily * 3,
            max_slippage_bps: 100,
            max_fee: 0,
            valid_from: NOW,
            expires_at: NOW + 30 * SECONDS_PER_DAY,
            cooldown_seconds: 0,
            risk_tier: 1,
            destination_allowlist: Vec::new(),
            nonce: 0,
        }
    }

    fn usage(agent: AgentId, amount: u64) -> UsageParams {
        UsageParams {
            agent,
            amount,
            action: ActionKind::Payment,
            destination: None,
            tx_ref: [0; 32],
        }
    }

    #[test]
    fn test_issue_requires_known_agent() {
        let f = fixture();
        assert_eq!(
            f.engine
                .issue_capability(&ALICE, params(AgentId([7; 32]), 10), NOW),
            Err(RailError::AgentNotFound)
        );
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 10), NOW).unwrap();
        assert_eq!(
            f.engine.issue_capability(&ALICE, params(f.agent, 10), NOW),
            Err(RailError::CapabilityAlreadyExists)
        );
        assert_eq!(f.engine.get(&id).unwrap().current_day, day_number(NOW));
        assert_eq!(f.engine.capabilities_of(&ALICE).len(), 1);
        assert_eq!(f.engine.capabilities_for_agent(&f.agent).len(), 1);
    }

    #[test]
    fn test_record_usage_rechecks_limits() {
        let f = fixture();
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 100), NOW).unwrap();
        f.engine.record_usage(&id, usage(f.agent, 60), NOW).unwrap();
        assert_eq!(
            f.engine.record_usage(&id, usage(f.agent, 41), NOW),
            Err(RailError::DailyLimitExceeded {
                requested: 41,
                remaining: 40
            })
        );
        assert_eq!(
            f.engine.record_usage(&id, usage(AgentId([9; 32]), 1), NOW),
            Err(RailError::AgentMismatch)
        );
        let cap = f.engine.get(&id).unwrap();
        assert_eq!((cap.daily_spent, cap.total_spent, cap.use_count), (60, 60, 1));
    }

    #[test]
    fn test_day_rollover_resets_before_adding() {
        let f = fixture();
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 100), NOW).unwrap();
        f.engine.record_usage(&id, usage(f.agent, 70), NOW).unwrap();

        let tomorrow = NOW + SECONDS_PER_DAY;
        f.engine.record_usage(&id, usage(f.agent, 30), tomorrow).unwrap();
        let cap = f.engine.get(&id).unwrap();
        assert_eq!(cap.daily_spent, 30);
        assert_eq!(cap.total_spent, 100);
        assert_eq!(cap.current_day, day_number(tomorrow));
    }

    #[test]
    fn test_revoke() {
        let f = fixture();
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 10), NOW).unwrap();
        assert!(matches!(
            f.engine.revoke_capability(&Address([5; 32]), &id, [0; 32], NOW),
            Err(RailError::Unauthorized { .. })
        ));
        let entry = f.engine.revoke_capability(&ALICE, &id, [4; 32], NOW).unwrap();
        assert_eq!(entry.reason_hash, [4; 32]);
        assert_eq!(f.engine.revocation(&id), Some(entry));
        assert_eq!(
            f.engine.revoke_capability(&ALICE, &id, [0; 32], NOW),
            Err(RailError::CapabilityRevoked)
        );
        assert_eq!(
            f.engine.record_usage(&id, usage(f.agent, 1), NOW),
            Err(RailError::CapabilityRevoked)
        );
        let req = ActionRequest::new(ActionKind::Payment, asset::SOL, 1);
        assert_eq!(
            f.engine.validate(&id, &req, NOW),
            Err(RailError::CapabilityRevoked)
        );
    }

    #[test]
    fn test_freeze_through_engine() {
        let f = fixture();
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 10), NOW).unwrap();
        let req = ActionRequest::new(ActionKind::Payment, asset::SOL, 1);

        f.engine.freeze(&ALICE, &id, &f.agent, [0; 32], NOW).unwrap();
        assert_eq!(f.engine.validate(&id, &req, NOW), Err(RailError::AgentFrozen));
        f.engine.unfreeze(&ALICE, &id, &f.agent, NOW).unwrap();
        assert!(f.engine.validate(&id, &req, NOW).is_ok());
    }

    #[test]
    fn test_concurrent_usage_never_overspends() {
        let f = fixture();
        let id = f.engine.issue_capability(&ALICE, params(f.agent, 100), NOW).unwrap();

        let successes: usize = std::thread::scope(|s| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    s.spawn(|| {
                        f.engine
                            .record_usage(&id, usage(f.agent, 10), NOW)
                            .is_ok() as usize
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).sum()
        });

        assert_eq!(successes, 10);
        let cap = f.engine.get(&id).unwrap();
        assert_eq!(cap.daily_spent, 100);
        assert_eq!(f.engine.usage_records(&id).len(), 10);
    }
}
