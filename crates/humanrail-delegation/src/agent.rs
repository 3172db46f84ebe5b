//! Agent registry
//!
//! Agents are principal-owned delegates with their own signing key. A
//! principal needs a minimum human score to register one. Signing keys can be
//! rotated; the previous key stays accepted for a grace window so in-flight
//! work signed with it is not rejected.

use humanrail_core::config::{AgentConfig, TrustConfig};
use humanrail_core::{
    Address, AgentId, Hash32, HumanScoreSource, KeyedArena, RailError, RailResult,
};
use serde::{Deserialize, Serialize};

/// Rotations remembered per agent.
pub const MAX_KEY_HISTORY: usize = 3;

/// Agent lifecycle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentStatus {
    /// May act
    #[default]
    Active,
    /// Temporarily disabled by its owner
    Suspended,
    /// Permanently disabled
    Revoked,
}

/// One signing key rotation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRotation {
    /// Key that was replaced
    pub old_key: Address,
    /// Replacement key
    pub new_key: Address,
    /// Rotation time
    pub rotated_at: i64,
    /// `old_key` is accepted strictly before this time
    pub old_key_expires_at: i64,
    /// 1-based rotation counter
    pub sequence: u32,
}

impl KeyRotation {
    /// Old key still inside its grace window
    pub fn is_old_key_valid(&self, now: i64) -> bool {
        now < self.old_key_expires_at
    }
}

/// A registered agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    /// Derived from `(owner, nonce)`
    pub id: AgentId,
    /// Owning principal
    pub owner: Address,
    /// Current signing key
    pub signing_key: Address,
    /// Display name
    pub name: String,
    /// Commitment to off-chain metadata
    pub metadata_hash: Hash32,
    /// Optional TEE measurement
    pub tee_measurement: Option<Hash32>,
    /// Lifecycle status
    pub status: AgentStatus,
    /// Most recent rotations, oldest first
    pub key_rotations: Vec<KeyRotation>,
    /// Rotations ever performed
    pub rotation_count: u32,
    /// Capabilities issued to this agent
    pub capability_count: u64,
    /// Receipts emitted by this agent
    pub action_count: u64,
    /// Registration nonce
    pub nonce: u64,
    /// Registration time
    pub created_at: i64,
    /// Last status change
    pub last_status_change: i64,
    /// Last metadata update
    pub last_metadata_update: i64,
}

impl AgentProfile {
    /// True while the agent may act
    pub fn is_active(&self) -> bool {
        self.status == AgentStatus::Active
    }

    /// `key` is the current key or a rotated-out key inside its grace window
    pub fn accepts_signer(&self, key: &Address, now: i64) -> bool {
        self.signing_key == *key
            || self
                .key_rotations
                .iter()
                .any(|r| r.old_key == *key && r.is_old_key_valid(now))
    }
}

/// Input to [`AgentRegistry::register_agent`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAgentParams {
    /// Initial signing key
    pub signing_key: Address,
    /// Display name
    pub name: String,
    /// Commitment to off-chain metadata
    pub metadata_hash: Hash32,
    /// Optional TEE measurement
    pub tee_measurement: Option<Hash32>,
    /// Disambiguates agents of one principal
    pub nonce: u64,
}

/// All registered agents
#[derive(Debug)]
pub struct AgentRegistry {
    min_agent_score: u16,
    key_rotation_grace_secs: i64,
    agents: KeyedArena<AgentId, AgentProfile>,
}

impl AgentRegistry {
    /// Registry using the trust and agent sections of the configuration
    pub fn new(trust: &TrustConfig, agents: &AgentConfig) -> Self {
        Self {
            min_agent_score: trust.min_agent_score,
            key_rotation_grace_secs: agents.key_rotation_grace_secs,
            agents: KeyedArena::new(),
        }
    }

    /// Register an agent for `principal`.
    pub fn register_agent(
        &self,
        principal: &Address,
        params: RegisterAgentParams,
        scores: &dyn HumanScoreSource,
        now: i64,
    ) -> RailResult<AgentId> {
        let score = scores
            .human_score(principal, now)
            .ok_or(RailError::ProfileNotFound)?;
        if score < self.min_agent_score {
            return Err(RailError::InsufficientHumanScore {
                score,
                required: self.min_agent_score,
            });
        }

        let id = AgentId::derive(principal, params.nonce);
        let agent = AgentProfile {
            id,
            owner: *principal,
            signing_key: params.signing_key,
            name: params.name,
            metadata_hash: params.metadata_hash,
            tee_measurement: params.tee_measurement,
            status: AgentStatus::Active,
            key_rotations: Vec::new(),
            rotation_count: 0,
            capability_count: 0,
            action_count: 0,
            nonce: params.nonce,
            created_at: now,
            last_status_change: now,
            last_metadata_update: now,
        };
        self.agents
            .insert_new(id, agent)
            .map_err(|_| RailError::AgentAlreadyExists)?;

        tracing::info!(agent = %id, principal = %principal, score, "agent registered");
        Ok(id)
    }

    fn with_owned<R>(
        &self,
        principal: &Address,
        id: &AgentId,
        f: impl FnOnce(&mut AgentProfile) -> RailResult<R>,
    ) -> RailResult<R> {
        self.agents
            .with_mut(id, |agent| {
                if agent.owner != *principal {
                    tracing::warn!(agent = %id, caller = %principal, "agent operation by non-owner");
                    return Err(RailError::unauthorized("caller does not own this agent"));
                }
                f(agent)
            })
            .ok_or(RailError::AgentNotFound)?
    }

    /// Replace the signing key. The old key stays valid for the grace window.
    pub fn rotate_key(
        &self,
        principal: &Address,
        id: &AgentId,
        new_key: Address,
        now: i64,
    ) -> RailResult<KeyRotation> {
        let grace = self.key_rotation_grace_secs;
        let rotation = self.with_owned(principal, id, |agent| {
            if agent.status == AgentStatus::Revoked {
                return Err(RailError::AgentRevoked);
            }
            if new_key == agent.signing_key {
                return Err(RailError::InvalidSigningKey);
            }
            agent.rotation_count = agent.rotation_count.saturating_add(1);
            let rotation = KeyRotation {
                old_key: agent.signing_key,
                new_key,
                rotated_at: now,
                old_key_expires_at: now.saturating_add(grace),
                sequence: agent.rotation_count,
            };
            agent.signing_key = new_key;
            agent.key_rotations.push(rotation.clone());
            if agent.key_rotations.len() > MAX_KEY_HISTORY {
                agent.key_rotations.remove(0);
            }
            Ok(rotation)
        })?;
        tracing::info!(
            agent = %id,
            sequence = rotation.sequence,
            old_key_expires_at = rotation.old_key_expires_at,
            "agent key rotated"
        );
        Ok(rotation)
    }

    /// Whether `key` may sign for the agent at `now`.
    pub fn is_signer_authorized(&self, id: &AgentId, key: &Address, now: i64) -> bool {
        self.agents
            .with(id, |agent| agent.accepts_signer(key, now))
            .unwrap_or(false)
    }

    /// Like [`Self::is_signer_authorized`] but distinguishes unknown agents.
    pub fn authorize_signer(&self, id: &AgentId, key: &Address, now: i64) -> RailResult<()> {
        let accepted = self
            .agents
            .with(id, |agent| agent.accepts_signer(key, now))
            .ok_or(RailError::AgentNotFound)?;
        if !accepted {
            tracing::warn!(agent = %id, signer = %key, "signer is not an agent key");
            return Err(RailError::AgentSignerMismatch);
        }
        Ok(())
    }

    /// Suspend an active agent.
    pub fn suspend(&self, principal: &Address, id: &AgentId, now: i64) -> RailResult<()> {
        self.with_owned(principal, id, |agent| match agent.status {
            AgentStatus::Revoked => Err(RailError::AgentRevoked),
            AgentStatus::Suspended => Err(RailError::AgentSuspended),
            AgentStatus::Active => {
                agent.status = AgentStatus::Suspended;
                agent.last_status_change = now;
                Ok(())
            }
        })?;
        tracing::info!(agent = %id, "agent suspended");
        Ok(())
    }

    /// Lift a suspension. Reactivating an active agent is a no-op.
    pub fn reactivate(&self, principal: &Address, id: &AgentId, now: i64) -> RailResult<()> {
        self.with_owned(principal, id, |agent| match agent.status {
            AgentStatus::Revoked => Err(RailError::AgentRevoked),
            AgentStatus::Active => Ok(()),
            AgentStatus::Suspended => {
                agent.status = AgentStatus::Active;
                agent.last_status_change = now;
                Ok(())
            }
        })?;
        tracing::info!(agent = %id, "agent reactivated");
        Ok(())
    }

    /// Permanently revoke an agent.
    pub fn revoke(&self, principal: &Address, id: &AgentId, now: i64) -> RailResult<()> {
        self.with_owned(principal, id, |agent| {
            if agent.status == AgentStatus::Revoked {
                return Err(RailError::AgentRevoked);
            }
            agent.status = AgentStatus::Revoked;
            agent.last_status_change = now;
            Ok(())
        })?;
        tracing::info!(agent = %id, "agent revoked");
        Ok(())
    }

    /// Replace metadata commitments.
    pub fn update_metadata(
        &self,
        principal: &Address,
        id: &AgentId,
        metadata_hash: Hash32,
        tee_measurement: Option<Hash32>,
        now: i64,
    ) -> RailResult<()> {
        self.with_owned(principal, id, |agent| {
            if agent.status == AgentStatus::Revoked {
                return Err(RailError::AgentRevoked);
            }
            agent.metadata_hash = metadata_hash;
            if tee_measurement.is_some() {
                agent.tee_measurement = tee_measurement;
            }
            agent.last_metadata_update = now;
            Ok(())
        })
    }

    /// Active agent snapshot, or `AgentNotActive`.
    pub fn verify_agent(&self, id: &AgentId) -> RailResult<AgentProfile> {
        let agent = self.get(id)?;
        if !agent.is_active() {
            return Err(RailError::AgentNotActive);
        }
        Ok(agent)
    }

    /// Agent snapshot
    pub fn get(&self, id: &AgentId) -> RailResult<AgentProfile> {
        self.agents.get(id).ok_or(RailError::AgentNotFound)
    }

    /// Agents owned by `principal`
    pub fn agents_of(&self, principal: &Address) -> Vec<AgentProfile> {
        let mut out = self.agents.filter_cloned(|a| a.owner == *principal);
        out.sort_by_key(|a| a.nonce);
        out
    }

    pub(crate) fn record_capability_issued(&self, id: &AgentId) {
        self.agents.with_mut(id, |agent| {
            agent.capability_count = agent.capability_count.saturating_add(1);
        });
    }

    /// Count one emitted action against the agent.
    pub fn record_action(&self, id: &AgentId) -> RailResult<u64> {
        self.agents
            .with_mut(id, |agent| {
                agent.action_count = agent.action_count.saturating_add(1);
                agent.action_count
            })
            .ok_or(RailError::AgentNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const OWNER: Address = Address([1; 32]);
    const KEY: Address = Address([2; 32]);

    fn registry() -> AgentRegistry {
        AgentRegistry::new(&TrustConfig::default(), &AgentConfig::default())
    }

    fn scores(score: u16) -> HashMap<Address, u16> {
        HashMap::from([(OWNER, score)])
    }

    fn params(nonce: u64) -> RegisterAgentParams {
        RegisterAgentParams {
            signing_key: KEY,
            name: "worker".into(),
            metadata_hash: [0; 32],
            tee_measurement: None,
            nonce,
        }
    }

    #[test]
    fn test_registration_requires_score() {
        let reg = registry();
        assert_eq!(
            reg.register_agent(&OWNER, params(0), &scores(49), 0),
            Err(RailError::InsufficientHumanScore {
                score: 49,
                required: 50
            })
        );
        assert_eq!(
            reg.register_agent(&OWNER, params(0), &HashMap::<Address, u16>::new(), 0),
            Err(RailError::ProfileNotFound)
        );
        let id = reg.register_agent(&OWNER, params(0), &scores(50), 0).unwrap();
        assert_eq!(id, AgentId::derive(&OWNER, 0));
        assert_eq!(
            reg.register_agent(&OWNER, params(0), &scores(50), 0),
            Err(RailError::AgentAlreadyExists)
        );
    }

    #[test]
    fn test_rotation_grace_window() {
        let reg = registry();
        let id = reg.register_agent(&OWNER, params(0), &scores(100), 0).unwrap();
        let new_key = Address([3; 32]);

        assert_eq!(
            reg.rotate_key(&OWNER, &id, KEY, 10),
            Err(RailError::InvalidSigningKey)
        );
        let rotation = reg.rotate_key(&OWNER, &id, new_key, 1_000).unwrap();
        assert_eq!(rotation.old_key_expires_at, 1_000 + 86_400);

        assert!(reg.is_signer_authorized(&id, &new_key, 1_001));
        assert!(reg.is_signer_authorized(&id, &KEY, 1_000 + 86_399));
        assert!(!reg.is_signer_authorized(&id, &KEY, 1_000 + 86_400));
        assert_eq!(
            reg.authorize_signer(&id, &KEY, 200_000),
            Err(RailError::AgentSignerMismatch)
        );
    }

    #[test]
    fn test_key_history_bounded() {
        let reg = registry();
        let id = reg.register_agent(&OWNER, params(0), &scores(100), 0).unwrap();
        for i in 0..5u8 {
            reg.rotate_key(&OWNER, &id, Address([10 + i; 32]), i64::from(i)).unwrap();
        }
        let agent = reg.get(&id).unwrap();
        assert_eq!(agent.key_rotations.len(), MAX_KEY_HISTORY);
        assert_eq!(agent.rotation_count, 5);
        assert_eq!(agent.key_rotations[0].sequence, 3);
    }

    #[test]
    fn test_lifecycle() {
        let reg = registry();
        let id = reg.register_agent(&OWNER, params(0), &scores(100), 0).unwrap();

        let stranger = Address([9; 32]);
        assert!(matches!(
            reg.suspend(&stranger, &id, 1),
            Err(RailError::Unauthorized { .. })
        ));

        reg.suspend(&OWNER, &id, 1).unwrap();
        assert_eq!(reg.suspend(&OWNER, &id, 2), Err(RailError::AgentSuspended));
        assert_eq!(reg.verify_agent(&id), Err(RailError::AgentNotActive));

        reg.reactivate(&OWNER, &id, 3).unwrap();
        assert!(reg.verify_agent(&id).is_ok());

        reg.revoke(&OWNER, &id, 4).unwrap();
        assert_eq!(reg.revoke(&OWNER, &id, 5), Err(RailError::AgentRevoked));
        assert_eq!(reg.reactivate(&OWNER, &id, 5), Err(RailError::AgentRevoked));
        assert_eq!(
            reg.rotate_key(&OWNER, &id, Address([7; 32]), 5),
            Err(RailError::AgentRevoked)
        );
    }

    #[test]
    fn test_counters() {
        let reg = registry();
        let id = reg.register_agent(&OWNER, params(0), &scores(100), 0).unwrap();
        assert_eq!(reg.record_action(&id), Ok(1));
        assert_eq!(reg.record_action(&id), Ok(2));
        reg.record_capability_issued(&id);
        assert_eq!(reg.get(&id).unwrap().capability_count, 1);
        assert_eq!(reg.record_action(&AgentId([0; 32])), Err(RailError::AgentNotFound));
    }
}
