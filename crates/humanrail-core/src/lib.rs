//! HumanRail Core - shared vocabulary for delegation and attestation
//!
//! Types and utilities every HumanRail crate builds on. Nothing here holds
//! engine state except [`arena::KeyedArena`], the generic per-key store.
//!
//! # Modules
//! - [`identifiers`]: `Address` and derived 32-byte entity ids
//! - [`scope`]: program/asset scope bits and [`ActionKind`]
//! - [`time`]: day numbering for daily spend windows
//! - [`errors`]: unified [`RailError`] and its taxonomy
//! - [`config`]: [`RailConfig`] loaded from TOML + environment
//! - [`arena`]: single-writer-per-key record storage
//! - [`crypto`]: SHA-256, Merkle commitments, Ed25519 verification
//! - [`score`]: the [`HumanScoreSource`] seam

#![forbid(unsafe_code)]

/// Single-writer-per-key record storage
pub mod arena;

/// Engine configuration
pub mod config;

/// Hashing and signatures
pub mod crypto;

/// Unified error handling
pub mod errors;

/// Addresses and entity ids
pub mod identifiers;

/// Scope bitmasks and action kinds
pub mod scope;

/// Human-score lookup seam
pub mod score;

/// Day numbering
pub mod time;

pub use arena::KeyedArena;
pub use config::RailConfig;
pub use errors::{ErrorKind, RailError, RailResult};
pub use identifiers::{
    Address, AgentId, AttestationId, CapabilityId, IssuerId, ProfileId, ReceiptId, UsageId,
};
pub use scope::ActionKind;
pub use score::HumanScoreSource;
pub use time::{day_number, UnixSeconds, SECONDS_PER_DAY};

/// 32-byte opaque digest (payload commitments, action/result hashes, reason hashes)
pub type Hash32 = [u8; 32];
