//! HumanRail Attestation - proof of personhood
//!
//! Issuers sign claims about a wallet's humanity. This crate verifies those
//! signatures against the fixed signing layout in [`codec`], records accepted
//! attestations on the wallet's [`HumanProfile`], and aggregates them into a
//! human score and uniqueness flag with [`TrustScoreEngine`].
//!
//! ```text
//! issuer signs 146-byte message
//!     -> AttestationVerifier::verify_and_register
//!         -> TrustScoreEngine::recompute(profile)
//! ```

#![forbid(unsafe_code)]

/// Signing message layout
pub mod codec;

/// Issuer registry
pub mod issuer;

/// Profiles and attestation records
pub mod profile;

/// Score aggregation and human verification
pub mod trust_score;

/// Signature verification and registration
pub mod verifier;

pub use codec::{AttestationMessage, DOMAIN_SEPARATOR, SIGNING_MESSAGE_LEN};
pub use issuer::{Issuer, IssuerKind, IssuerRegistry, IssuerStatus, RegisterIssuerParams};
pub use profile::{
    AttestationRef, AttestationStatus, EffectiveAttestationStatus, HumanProfile, SignedAttestation,
};
pub use trust_score::{flags, HumanRequirements, HumanVerification, TrustScore, TrustScoreEngine};
pub use verifier::{AttestationError, AttestationParams, AttestationVerifier};
