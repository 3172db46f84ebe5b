//! Unified error type for HumanRail
//!
//! Every component returns a [`RailError`]; no component retries internally.
//! The calling layer uses [`RailError::kind`] to decide whether a failure is a
//! recoverable policy refusal or a hard authorization/cryptographic failure.

use serde::{Deserialize, Serialize};

/// Coarse classification of a [`RailError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Signature or message integrity failure. Never retried.
    Cryptographic,
    /// Caller or identity mismatch.
    Authorization,
    /// Reuse of a nonce or identifier that must be fresh.
    Replay,
    /// Request exceeds a policy bound; the caller may adjust or wait.
    Policy,
    /// Entity is in a lifecycle state that forbids the operation.
    Lifecycle,
    /// Malformed or inconsistent caller input.
    InputValidation,
    /// Referenced entity does not exist.
    NotFound,
    /// Configuration or internal failure.
    Internal,
}

/// Unified error for every HumanRail operation
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RailError {
    // --- cryptographic -----------------------------------------------------
    /// Signature did not verify over the reconstructed message, or the signer
    /// is not the issuer's authority.
    #[error("Signature invalid")]
    SignatureInvalid,

    /// Byte message could not be decoded.
    #[error("Malformed message: {message}")]
    MalformedMessage {
        /// What was wrong with the input
        message: String,
    },

    // --- authorization -----------------------------------------------------
    /// Caller is not the principal/owner/admin required for the operation.
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Which ownership check failed
        message: String,
    },

    /// Acting agent does not own the capability.
    #[error("Agent is not the holder of this capability")]
    AgentMismatch,

    /// Emitter key is neither the agent's current nor grace-period signing key.
    #[error("Signer is not an authorized key for this agent")]
    AgentSignerMismatch,

    // --- replay ------------------------------------------------------------
    /// `(profile, issuer, nonce)` was already used.
    #[error("Attestation nonce {nonce} already used for this profile and issuer")]
    ReplayedNonce {
        /// The replayed nonce
        nonce: u64,
    },

    /// `(agent, nonce)` receipt already exists.
    #[error("Receipt already exists for agent nonce {nonce}")]
    ReceiptAlreadyExists {
        /// The duplicated receipt nonce
        nonce: u64,
    },

    /// A profile already exists for this wallet.
    #[error("Profile already exists")]
    ProfileAlreadyExists,

    /// An issuer already exists for this authority.
    #[error("Issuer already exists")]
    IssuerAlreadyExists,

    /// A capability already exists for `(principal, agent, nonce)`.
    #[error("Capability already exists")]
    CapabilityAlreadyExists,

    /// An agent already exists for `(principal, nonce)`.
    #[error("Agent already exists")]
    AgentAlreadyExists,

    // --- policy ------------------------------------------------------------
    /// Action value exceeds the per-transaction ceiling.
    #[error("Per-transaction limit exceeded: requested {requested}, limit {limit}")]
    PerTxLimitExceeded {
        /// Requested amount
        requested: u64,
        /// Per-transaction limit
        limit: u64,
    },

    /// Action value would exceed today's remaining budget.
    #[error("Daily limit exceeded: requested {requested}, remaining {remaining}")]
    DailyLimitExceeded {
        /// Requested amount
        requested: u64,
        /// Budget left for the current day
        remaining: u64,
    },

    /// Action value would exceed the lifetime budget.
    #[error("Total limit exceeded: requested {requested}, remaining {remaining}")]
    TotalLimitExceeded {
        /// Requested amount
        requested: u64,
        /// Budget left for the capability lifetime
        remaining: u64,
    },

    /// Minimum gap between uses has not elapsed.
    #[error("Cooldown not elapsed: {remaining_secs}s remaining")]
    CooldownNotElapsed {
        /// Seconds until the next use is allowed
        remaining_secs: i64,
    },

    /// Destination is not in the capability allowlist.
    #[error("Destination not in allowlist")]
    DestinationNotAllowed,

    /// Program scope bit is not granted.
    #[error("Program not allowed by capability")]
    ProgramNotAllowed,

    /// Asset scope bit is not granted.
    #[error("Asset type not allowed by capability")]
    AssetNotAllowed,

    /// Capability risk tier is below the tier required by the integration.
    #[error("Risk tier {tier} below required tier {required}")]
    RiskTierExceeded {
        /// Tier stored on the capability
        tier: u8,
        /// Tier the caller requires
        required: u8,
    },

    /// Requested slippage exceeds `max_slippage_bps`.
    #[error("Slippage exceeds maximum allowed")]
    SlippageExceeded,

    /// Requested fee exceeds `max_fee`.
    #[error("Fee exceeds maximum allowed")]
    FeeExceeded,

    /// Profile score is below the required threshold.
    #[error("Human score {score} below required {required}")]
    InsufficientHumanScore {
        /// Effective score
        score: u16,
        /// Score required
        required: u16,
    },

    /// Profile is not a proven unique individual.
    #[error("Profile is not unique")]
    NotUnique,

    /// Profile has fewer active attestations than required.
    #[error("Insufficient active attestations: {active} < {required}")]
    InsufficientAttestations {
        /// Active attestation count
        active: u32,
        /// Count required
        required: u32,
    },

    // --- lifecycle ---------------------------------------------------------
    /// Capability is not in the Active state.
    #[error("Capability is not active")]
    CapabilityNotActive,

    /// Capability has been revoked.
    #[error("Capability has been revoked")]
    CapabilityRevoked,

    /// Capability is past `expires_at`.
    #[error("Capability has expired")]
    CapabilityExpired,

    /// Capability is frozen.
    #[error("Capability is frozen")]
    CapabilityFrozen,

    /// Capability is under dispute.
    #[error("Capability is under dispute")]
    CapabilityDisputed,

    /// Capability is before `valid_from`.
    #[error("Capability not yet valid")]
    CapabilityNotYetValid,

    /// Capability is already disputed.
    #[error("Capability already disputed")]
    AlreadyDisputed,

    /// Capability is not disputed.
    #[error("Capability not disputed")]
    NotDisputed,

    /// Principal has frozen this agent.
    #[error("Agent is frozen - all capabilities suspended")]
    AgentFrozen,

    /// No active freeze exists for this pair.
    #[error("Agent is not frozen")]
    AgentNotFrozen,

    /// Agent is not active.
    #[error("Agent is not active")]
    AgentNotActive,

    /// Agent has been permanently revoked.
    #[error("Agent has been permanently revoked")]
    AgentRevoked,

    /// Agent is suspended.
    #[error("Agent is suspended")]
    AgentSuspended,

    /// Issuer is suspended.
    #[error("Issuer is not active")]
    IssuerNotActive,

    /// Attestation was already revoked.
    #[error("Attestation already revoked")]
    AttestationAlreadyRevoked,

    // --- input validation --------------------------------------------------
    /// Limits are inconsistent (`per_tx <= daily <= total` violated, or bounds exceeded).
    #[error("Invalid limits configuration: {message}")]
    InvalidLimits {
        /// Which bound was violated
        message: String,
    },

    /// Expiry is in the past or not after `valid_from`.
    #[error("Invalid expiry time")]
    InvalidExpiry,

    /// Destination allowlist is longer than allowed.
    #[error("Too many destinations in allowlist: {count} > {max}")]
    TooManyDestinations {
        /// Supplied length
        count: usize,
        /// Maximum length
        max: usize,
    },

    /// Attestation weight is above the issuer's cap.
    #[error("Weight {weight} exceeds issuer cap {max_weight}")]
    WeightExceedsIssuerCap {
        /// Declared weight
        weight: u16,
        /// Issuer cap
        max_weight: u16,
    },

    /// Weight is zero or outside the global range.
    #[error("Invalid weight: {weight}")]
    InvalidWeight {
        /// Offending weight
        weight: u16,
    },

    /// `expires_at <= issued_at`.
    #[error("Invalid validity window")]
    InvalidValidityWindow,

    /// Profile holds the maximum number of active attestations.
    #[error("Maximum number of attestations reached")]
    TooManyAttestations,

    /// New signing key equals the current key.
    #[error("Invalid signing key")]
    InvalidSigningKey,

    /// Batch has no entries.
    #[error("Batch is empty")]
    EmptyBatch,

    /// Batch exceeds the configured size.
    #[error("Batch too large: {size} > {max}")]
    BatchTooLarge {
        /// Supplied size
        size: usize,
        /// Maximum size
        max: usize,
    },

    /// Off-chain reference exceeds the configured length.
    #[error("Offchain reference too long: {len} > {max}")]
    OffchainRefTooLong {
        /// Supplied length
        len: usize,
        /// Maximum length
        max: usize,
    },

    // --- not found ---------------------------------------------------------
    /// Unknown profile.
    #[error("Profile not found")]
    ProfileNotFound,

    /// Unknown issuer.
    #[error("Issuer not found")]
    IssuerNotFound,

    /// Unknown attestation.
    #[error("Attestation not found")]
    AttestationNotFound,

    /// Unknown capability.
    #[error("Capability not found")]
    CapabilityNotFound,

    /// Unknown agent.
    #[error("Agent not found")]
    AgentNotFound,

    /// Unknown receipt.
    #[error("Receipt not found")]
    ReceiptNotFound,

    // --- internal ----------------------------------------------------------
    /// Configuration could not be loaded or failed validation.
    #[error("Config error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },
}

impl RailError {
    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create an invalid limits error
    pub fn invalid_limits(message: impl Into<String>) -> Self {
        Self::InvalidLimits {
            message: message.into(),
        }
    }

    /// Create a malformed message error
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Taxonomy bucket for this error.
    pub fn kind(&self) -> ErrorKind {
        use RailError::*;
        match self {
            SignatureInvalid | MalformedMessage { .. } => ErrorKind::Cryptographic,
            Unauthorized { .. } | AgentMismatch | AgentSignerMismatch => ErrorKind::Authorization,
            ReplayedNonce { .. }
            | ReceiptAlreadyExists { .. }
            | ProfileAlreadyExists
            | IssuerAlreadyExists
            | CapabilityAlreadyExists
            | AgentAlreadyExists => ErrorKind::Replay,
            PerTxLimitExceeded { .. }
            | DailyLimitExceeded { .. }
            | TotalLimitExceeded { .. }
            | CooldownNotElapsed { .. }
            | DestinationNotAllowed
            | ProgramNotAllowed
            | AssetNotAllowed
            | RiskTierExceeded { .. }
            | SlippageExceeded
            | FeeExceeded
            | InsufficientHumanScore { .. }
            | NotUnique
            | InsufficientAttestations { .. } => ErrorKind::Policy,
            CapabilityNotActive
            | CapabilityRevoked
            | CapabilityExpired
            | CapabilityFrozen
            | CapabilityDisputed
            | CapabilityNotYetValid
            | AlreadyDisputed
            | NotDisputed
            | AgentFrozen
            | AgentNotFrozen
            | AgentNotActive
            | AgentRevoked
            | AgentSuspended
            | IssuerNotActive
            | AttestationAlreadyRevoked => ErrorKind::Lifecycle,
            InvalidLimits { .. }
            | InvalidExpiry
            | TooManyDestinations { .. }
            | WeightExceedsIssuerCap { .. }
            | InvalidWeight { .. }
            | InvalidValidityWindow
            | TooManyAttestations
            | InvalidSigningKey
            | EmptyBatch
            | BatchTooLarge { .. }
            | OffchainRefTooLong { .. } => ErrorKind::InputValidation,
            ProfileNotFound
            | IssuerNotFound
            | AttestationNotFound
            | CapabilityNotFound
            | AgentNotFound
            | ReceiptNotFound => ErrorKind::NotFound,
            Config { .. } => ErrorKind::Internal,
        }
    }

    /// True for policy refusals the caller may resolve by adjusting the
    /// request or waiting. Everything else is a hard failure.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::Policy
    }
}

/// Standard Result type for HumanRail operations
pub type RailResult<T> = std::result::Result<T, RailError>;

impl From<toml::de::Error> for RailError {
    fn from(err: toml::de::Error) -> Self {
        Self::config(err.to_string())
    }
}

impl From<std::io::Error> for RailError {
    fn from(err: std::io::Error) -> Self {
        Self::config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = RailError::unauthorized("caller is not the principal");
        assert!(matches!(err, RailError::Unauthorized { .. }));
        assert_eq!(err.to_string(), "Unauthorized: caller is not the principal");
    }

    #[test]
    fn test_taxonomy() {
        assert_eq!(RailError::SignatureInvalid.kind(), ErrorKind::Cryptographic);
        assert_eq!(RailError::AgentSignerMismatch.kind(), ErrorKind::Authorization);
        assert_eq!(
            RailError::ReplayedNonce { nonce: 7 }.kind(),
            ErrorKind::Replay
        );
        assert_eq!(RailError::AgentFrozen.kind(), ErrorKind::Lifecycle);
        assert_eq!(RailError::InvalidValidityWindow.kind(), ErrorKind::InputValidation);
        assert_eq!(RailError::CapabilityNotFound.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_only_policy_errors_are_recoverable() {
        assert!(RailError::DailyLimitExceeded {
            requested: 10,
            remaining: 0
        }
        .is_recoverable());
        assert!(RailError::CooldownNotElapsed { remaining_secs: 5 }.is_recoverable());
        assert!(!RailError::SignatureInvalid.is_recoverable());
        assert!(!RailError::unauthorized("x").is_recoverable());
        assert!(!RailError::CapabilityRevoked.is_recoverable());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = RailError::from(io_err);
        assert!(matches!(err, RailError::Config { .. }));
    }
}
