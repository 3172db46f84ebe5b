//! Receipt records and their canonical hash

use humanrail_core::crypto::hasher;
use humanrail_core::{ActionKind, Address, AgentId, CapabilityId, Hash32, ReceiptId};
use serde::{Deserialize, Serialize};

/// Domain tag prefixed to every receipt hash
pub const RECEIPT_HASH_DOMAIN: &[u8] = b"humanrail:receipt:v1";

/// Immutable record of one authorized and executed action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionReceipt {
    /// Derived from `(agent, nonce)`
    pub id: ReceiptId,
    /// Principal that authorized the action
    pub principal: Address,
    /// Agent that executed it
    pub agent: AgentId,
    /// Capability used
    pub capability: CapabilityId,
    /// Hash of the action request
    pub action_hash: Hash32,
    /// Hash of the action result
    pub result_hash: Hash32,
    /// Kind of action
    pub action: ActionKind,
    /// Value moved or affected
    pub value: u64,
    /// Destination, if any
    pub destination: Option<Address>,
    /// Off-chain reference (content hash, URI, ...)
    pub offchain_ref: Option<Vec<u8>>,
    /// Per-agent sequence number, starting at 1
    pub sequence: u64,
    /// Replay key within the agent
    pub nonce: u64,
    /// Emission time
    pub timestamp: i64,
    /// Root of the batch this receipt was emitted in
    pub batch_root: Option<Hash32>,
}

impl ActionReceipt {
    pub(crate) fn from_params(
        params: EmitReceiptParams,
        sequence: u64,
        timestamp: i64,
        batch_root: Option<Hash32>,
    ) -> Self {
        Self {
            id: params.receipt_id(),
            principal: params.principal,
            agent: params.agent,
            capability: params.capability,
            action_hash: params.action_hash,
            result_hash: params.result_hash,
            action: params.action,
            value: params.value,
            destination: params.destination,
            offchain_ref: params.offchain_ref,
            sequence,
            nonce: params.nonce,
            timestamp,
            batch_root,
        }
    }

    /// SHA-256 over a fixed little-endian encoding of the receipt.
    ///
    /// `batch_root` is excluded because the root commits to this hash.
    pub fn receipt_hash(&self) -> Hash32 {
        let mut h = hasher();
        h.update(RECEIPT_HASH_DOMAIN)
            .update(self.id.as_bytes())
            .update(self.principal.as_bytes())
            .update(self.agent.as_bytes())
            .update(self.capability.as_bytes())
            .update(self.action_hash)
            .update(self.result_hash)
            .update([self.action.code()])
            .update(self.value.to_le_bytes());
        match &self.destination {
            Some(d) => h.update([1u8]).update(d.as_bytes()),
            None => h.update([0u8]),
        };
        match &self.offchain_ref {
            Some(r) => h.update([1u8]).update((r.len() as u32).to_le_bytes()).update(r),
            None => h.update([0u8]),
        };
        h.update(self.sequence.to_le_bytes())
            .update(self.nonce.to_le_bytes())
            .update(self.timestamp.to_le_bytes());
        h.finalize()
    }
}

/// Input to receipt emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmitReceiptParams {
    /// Authorizing principal
    pub principal: Address,
    /// Acting agent
    pub agent: AgentId,
    /// Capability used
    pub capability: CapabilityId,
    /// Hash of the action request
    pub action_hash: Hash32,
    /// Hash of the action result
    pub result_hash: Hash32,
    /// Kind of action
    pub action: ActionKind,
    /// Value moved or affected
    pub value: u64,
    /// Destination, if any
    pub destination: Option<Address>,
    /// Off-chain reference
    pub offchain_ref: Option<Vec<u8>>,
    /// Replay key within the agent
    pub nonce: u64,
}

impl EmitReceiptParams {
    /// Id the receipt will get
    pub fn receipt_id(&self) -> ReceiptId {
        ReceiptId::derive(&self.agent, self.nonce)
    }
}

/// Running totals for one agent or principal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptIndex {
    /// Receipts emitted
    pub receipt_count: u64,
    /// Most recent receipt
    pub latest_receipt: Option<ReceiptId>,
    /// Time of the most recent receipt
    pub latest_timestamp: i64,
    /// Sum of receipt values, saturating
    pub total_value: u64,
}

impl ReceiptIndex {
    pub(crate) fn record(&mut self, receipt: &ActionReceipt) {
        self.receipt_count += 1;
        self.latest_receipt = Some(receipt.id);
        self.latest_timestamp = receipt.timestamp;
        self.total_value = self.total_value.saturating_add(receipt.value);
    }
}

/// Summary of one batch emission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Merkle root over the receipt hashes, in batch order
    pub merkle_root: Hash32,
    /// Receipts in the batch
    pub receipt_count: u32,
    /// First receipt
    pub first_receipt: ReceiptId,
    /// Last receipt
    pub last_receipt: ReceiptId,
    /// Batch time
    pub created_at: i64,
    /// Sum of values, saturating
    pub total_value: u64,
    /// Receipt hashes in batch order
    pub leaves: Vec<Hash32>,
}
