//! HumanRail Receipts - append-only audit trail of agent actions
//!
//! After an action has been authorized and executed, the caller emits an
//! [`ActionReceipt`] binding principal, agent, capability, request and result
//! hashes. Receipts are sequenced per agent and never mutated. Batches commit
//! to their receipts with a Merkle root so a single receipt can later be
//! proven part of a batch.

#![forbid(unsafe_code)]

/// Receipt store, indices and batch proofs
pub mod ledger;

/// Receipt records and hashing
pub mod receipt;

pub use ledger::{verify_batch_inclusion, ReceiptLedger};
pub use receipt::{
    ActionReceipt, BatchSummary, EmitReceiptParams, ReceiptIndex, RECEIPT_HASH_DOMAIN,
};
