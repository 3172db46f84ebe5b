//! HumanRail - human trust and bounded agent delegation
//!
//! Two halves meet in this crate:
//!
//! - **Attestation**: issuers sign 146-byte claims about a wallet, which are
//!   verified and aggregated into a human score and uniqueness flag.
//! - **Delegation**: a sufficiently trusted principal registers agents and
//!   issues them scoped, rate-limited capabilities. Every action is checked
//!   with `validate`, committed with `record_usage`, and logged as a receipt.
//!
//! ```text
//! issuer --sign--> AttestationVerifier --> TrustScoreEngine --> human_score
//!                                                                  |
//! principal --register_agent (score gate)--> AgentRegistry         v
//! principal --issue_capability--> CapabilityEngine <-- FreezeRegistry, DisputeLedger
//! agent --validate / record_usage--> CapabilityEngine --> ReceiptLedger
//! ```
//!
//! [`HumanRail`] assembles all of it; the underlying crates are re-exported
//! for callers that need only one part.

#![forbid(unsafe_code)]

/// Assembled engine
pub mod rail;

pub use rail::HumanRail;

pub use humanrail_attestation as attestation;
pub use humanrail_core as primitives;
pub use humanrail_delegation as delegation;
pub use humanrail_receipts as receipts;

pub use humanrail_core::{ErrorKind, RailConfig, RailError, RailResult};
