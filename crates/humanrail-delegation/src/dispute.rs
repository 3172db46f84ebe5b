//! Capability disputes
//!
//! ```text
//! Active --flag--> Disputed --Cleared|Modified--> Active
//!                           --Revoked-----------> Revoked
//! ```
//!
//! Every flag and resolution is appended to a per-capability history that is
//! never rewritten.

use crate::capability::{CapabilityStatus, CapabilityStore};
use humanrail_core::{Address, CapabilityId, Hash32, KeyedArena, RailError, RailResult};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Outcome of a dispute review
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeResolution {
    /// Dispute dismissed; capability returns to Active
    Cleared,
    /// Capability revoked permanently
    Revoked,
    /// Parameters were adjusted by the caller; capability returns to Active
    Modified,
}

/// One entry of a capability's dispute history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisputeEvent {
    /// Dispute opened
    Flagged {
        /// Flagging principal
        by: Address,
        /// Commitment to the reason
        reason_hash: Hash32,
        /// Flag time
        at: i64,
    },
    /// Dispute closed
    Resolved {
        /// Resolving principal
        by: Address,
        /// Decision
        resolution: DisputeResolution,
        /// Resolution time
        at: i64,
    },
}

/// Dispute transitions over the shared capability store
#[derive(Debug)]
pub struct DisputeLedger {
    capabilities: Arc<CapabilityStore>,
    history: KeyedArena<CapabilityId, Vec<DisputeEvent>>,
}

impl DisputeLedger {
    /// Ledger operating on `capabilities`
    pub fn new(capabilities: Arc<CapabilityStore>) -> Self {
        Self {
            capabilities,
            history: KeyedArena::new(),
        }
    }

    fn append(&self, id: &CapabilityId, event: DisputeEvent) {
        self.history
            .upsert_with(*id, Vec::new, |events| events.push(event));
    }

    /// Move an Active capability to Disputed.
    pub fn flag_dispute(
        &self,
        principal: &Address,
        id: &CapabilityId,
        reason_hash: Hash32,
        now: i64,
    ) -> RailResult<()> {
        self.capabilities
            .with_mut(id, |cap| {
                if cap.principal != *principal {
                    tracing::warn!(capability = %id, caller = %principal, "dispute by non-issuing principal");
                    return Err(RailError::unauthorized(
                        "caller did not issue this capability",
                    ));
                }
                match cap.status {
                    CapabilityStatus::Active => {}
                    CapabilityStatus::Disputed => return Err(RailError::AlreadyDisputed),
                    CapabilityStatus::Revoked => return Err(RailError::CapabilityRevoked),
                    CapabilityStatus::Frozen => return Err(RailError::CapabilityNotActive),
                }
                cap.status = CapabilityStatus::Disputed;
                cap.dispute_reason = Some(reason_hash);
                self.append(
                    id,
                    DisputeEvent::Flagged {
                        by: *principal,
                        reason_hash,
                        at: now,
                    },
                );
                Ok(())
            })
            .ok_or(RailError::CapabilityNotFound)??;
        tracing::info!(capability = %id, "capability disputed");
        Ok(())
    }

    /// Close the dispute on a Disputed capability.
    pub fn resolve_dispute(
        &self,
        principal: &Address,
        id: &CapabilityId,
        resolution: DisputeResolution,
        now: i64,
    ) -> RailResult<CapabilityStatus> {
        let status = self
            .capabilities
            .with_mut(id, |cap| {
                if cap.principal != *principal {
                    tracing::warn!(capability = %id, caller = %principal, "dispute resolution by non-issuing principal");
                    return Err(RailError::unauthorized(
                        "caller did not issue this capability",
                    ));
                }
                if cap.status != CapabilityStatus::Disputed {
                    return Err(RailError::NotDisputed);
                }
                cap.status = match resolution {
                    DisputeResolution::Cleared | DisputeResolution::Modified => {
                        CapabilityStatus::Active
                    }
                    DisputeResolution::Revoked => CapabilityStatus::Revoked,
                };
                cap.dispute_reason = None;
                self.append(
                    id,
                    DisputeEvent::Resolved {
                        by: *principal,
                        resolution,
                        at: now,
                    },
                );
                Ok(cap.status)
            })
            .ok_or(RailError::CapabilityNotFound)??;
        tracing::info!(capability = %id, ?resolution, "dispute resolved");
        Ok(status)
    }

    /// Dispute history of a capability, oldest first
    pub fn history(&self, id: &CapabilityId) -> Vec<DisputeEvent> {
        self.history.get(id).unwrap_or_default()
    }
}
