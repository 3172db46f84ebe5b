//! HumanRail Delegation - bounded authority for agents
//!
//! A principal registers agents, then issues each one scoped, rate-limited,
//! time-bound [`Capability`] grants. Before an agent acts, the caller asks
//! [`CapabilityEngine::validate`]; after the action executes, it commits the
//! spend with [`CapabilityEngine::record_usage`].
//!
//! Two principal-initiated brakes sit beside the engine:
//! - [`FreezeRegistry`] stops every capability one principal issued to one agent
//! - [`DisputeLedger`] parks a single capability under review

#![forbid(unsafe_code)]

/// Agent registry and key rotation
pub mod agent;

/// Capability model and pure validation
pub mod capability;

/// Disputes over individual capabilities
pub mod dispute;

/// Issuance, validation and usage accounting
pub mod engine;

/// Principal-scoped freezes
pub mod freeze;

pub use agent::{
    AgentProfile, AgentRegistry, AgentStatus, KeyRotation, RegisterAgentParams, MAX_KEY_HISTORY,
};
pub use capability::{
    flags, validate_capability, ActionRequest, Capability, CapabilityError, CapabilityStatus,
    CapabilityStore, EffectiveStatus, IssueCapabilityParams, RevocationEntry, UsageParams,
    UsageRecord, ValidationOutcome,
};
pub use dispute::{DisputeEvent, DisputeLedger, DisputeResolution};
pub use engine::CapabilityEngine;
pub use freeze::{FreezeKey, FreezeRecord, FreezeRegistry};
