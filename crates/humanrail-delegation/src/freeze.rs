//! Principal-scoped emergency stops
//!
//! A freeze is keyed by `(principal, agent)`. It disables every capability
//! that principal issued to that agent and leaves capabilities from other
//! principals untouched.

use crate::capability::Capability;
use humanrail_core::{Address, AgentId, Hash32, KeyedArena, RailError, RailResult};
use serde::{Deserialize, Serialize};

/// Key of a freeze record
pub type FreezeKey = (Address, AgentId);

/// Emergency stop for one `(principal, agent)` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreezeRecord {
    /// Principal that froze the agent
    pub frozen_by: Address,
    /// Frozen agent
    pub agent: AgentId,
    /// Most recent freeze time
    pub frozen_at: i64,
    /// Whether the freeze is in force
    pub is_active: bool,
    /// Time of the last unfreeze
    pub unfrozen_at: Option<i64>,
    /// Commitment to the reason
    pub reason_hash: Hash32,
}

impl FreezeRecord {
    /// An active record
    pub fn active(frozen_by: Address, agent: AgentId, frozen_at: i64, reason_hash: Hash32) -> Self {
        Self {
            frozen_by,
            agent,
            frozen_at,
            is_active: true,
            unfrozen_at: None,
            reason_hash,
        }
    }
}

/// Freeze records for every `(principal, agent)` pair
#[derive(Debug, Default)]
pub struct FreezeRegistry {
    records: KeyedArena<FreezeKey, FreezeRecord>,
}

impl FreezeRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// `principal` must have issued `capability` and `capability` must name `agent`.
    fn authorize(principal: &Address, capability: &Capability, agent: &AgentId) -> RailResult<()> {
        if capability.principal != *principal {
            tracing::warn!(
                caller = %principal,
                capability = %capability.id,
                "freeze by a principal that did not issue the capability"
            );
            return Err(RailError::unauthorized(
                "caller did not issue this capability",
            ));
        }
        if capability.agent != *agent {
            tracing::warn!(
                caller = %principal,
                capability = %capability.id,
                agent = %agent,
                "freeze target is not the capability's agent"
            );
            return Err(RailError::unauthorized(
                "capability was not issued to this agent",
            ));
        }
        Ok(())
    }

    /// Freeze `agent` for `principal`. Freezing an already frozen pair
    /// refreshes `frozen_at` and the reason.
    pub fn freeze(
        &self,
        principal: &Address,
        capability: &Capability,
        agent: &AgentId,
        reason_hash: Hash32,
        now: i64,
    ) -> RailResult<FreezeRecord> {
        Self::authorize(principal, capability, agent)?;
        let record = self.records.upsert_with(
            (*principal, *agent),
            || FreezeRecord::active(*principal, *agent, now, reason_hash),
            |r| {
                r.is_active = true;
                r.frozen_at = now;
                r.reason_hash = reason_hash;
                r.clone()
            },
        );
        tracing::info!(principal = %principal, agent = %agent, "agent frozen");
        Ok(record)
    }

    /// Lift the freeze on `agent` for `principal`.
    pub fn unfreeze(
        &self,
        principal: &Address,
        capability: &Capability,
        agent: &AgentId,
        now: i64,
    ) -> RailResult<FreezeRecord> {
        Self::authorize(principal, capability, agent)?;
        let record = self
            .records
            .with_mut(&(*principal, *agent), |r| {
                if !r.is_active {
                    return Err(RailError::AgentNotFrozen);
                }
                r.is_active = false;
                r.unfrozen_at = Some(now);
                Ok(r.clone())
            })
            .ok_or(RailError::AgentNotFrozen)??;
        tracing::info!(principal = %principal, agent = %agent, "agent unfrozen");
        Ok(record)
    }

    /// Record for the pair, active or not
    pub fn record(&self, principal: &Address, agent: &AgentId) -> Option<FreezeRecord> {
        self.records.get(&(*principal, *agent))
    }

    /// Whether the pair is currently frozen
    pub fn is_frozen(&self, principal: &Address, agent: &AgentId) -> bool {
        self.records
            .with(&(*principal, *agent), |r| r.is_active)
            .unwrap_or(false)
    }
}
