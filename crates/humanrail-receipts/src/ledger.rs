//! Receipt ledger
//!
//! Append-only store of [`ActionReceipt`]s. Sequence numbers are assigned per
//! agent under that agent's index lock, so they are strictly increasing and
//! gap-free per agent. Batches are validated in full before anything is
//! written and exclude concurrent single emissions while they commit.

use crate::receipt::{ActionReceipt, BatchSummary, EmitReceiptParams, ReceiptIndex};
use humanrail_core::config::ReceiptConfig;
use humanrail_core::crypto::{merkle_proof, merkle_root, verify_merkle_proof, MerkleProof};
use humanrail_core::{Address, AgentId, Hash32, KeyedArena, RailError, RailResult, ReceiptId};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

// =============================================================================
// Ledger
// =============================================================================

/// Append-only receipt store with per-agent and per-principal indices
#[derive(Debug)]
pub struct ReceiptLedger {
    config: ReceiptConfig,
    receipts: KeyedArena<ReceiptId, ActionReceipt>,
    by_agent: KeyedArena<AgentId, ReceiptIndex>,
    by_principal: KeyedArena<Address, ReceiptIndex>,
    batches: KeyedArena<Hash32, BatchSummary>,
    // Single emissions share the gate; a batch holds it exclusively.
    gate: RwLock<()>,
}

impl ReceiptLedger {
    /// Empty ledger
    pub fn new(config: ReceiptConfig) -> Self {
        Self {
            config,
            receipts: KeyedArena::new(),
            by_agent: KeyedArena::new(),
            by_principal: KeyedArena::new(),
            batches: KeyedArena::new(),
            gate: RwLock::new(()),
        }
    }

    fn check_offchain_ref(&self, params: &EmitReceiptParams) -> RailResult<()> {
        match &params.offchain_ref {
            Some(r) if r.len() > self.config.max_offchain_ref_len => {
                Err(RailError::OffchainRefTooLong {
                    len: r.len(),
                    max: self.config.max_offchain_ref_len,
                })
            }
            _ => Ok(()),
        }
    }

    /// Write one receipt. The caller holds the gate.
    fn append(
        &self,
        params: EmitReceiptParams,
        batch_root: Option<Hash32>,
        now: i64,
    ) -> RailResult<ActionReceipt> {
        let receipt = self.by_agent.upsert_with(
            params.agent,
            ReceiptIndex::default,
            |index| -> RailResult<ActionReceipt> {
                let nonce = params.nonce;
                let receipt =
                    ActionReceipt::from_params(params, index.receipt_count + 1, now, batch_root);
                self.receipts
                    .insert_new(receipt.id, receipt.clone())
                    .map_err(|_| RailError::ReceiptAlreadyExists { nonce })?;
                index.record(&receipt);
                Ok(receipt)
            },
        )?;
        self.by_principal
            .upsert_with(receipt.principal, ReceiptIndex::default, |index| {
                index.record(&receipt);
            });
        Ok(receipt)
    }

    /// Emit one receipt.
    pub fn emit(&self, params: EmitReceiptParams, now: i64) -> RailResult<ActionReceipt> {
        self.check_offchain_ref(&params)?;
        let _shared = self.gate.read();
        let receipt = self.append(params, None, now).map_err(|err| {
            if matches!(err, RailError::ReceiptAlreadyExists { .. }) {
                tracing::warn!(error = %err, "duplicate receipt nonce");
            }
            err
        })?;
        tracing::info!(
            receipt = %receipt.id,
            agent = %receipt.agent,
            capability = %receipt.capability,
            sequence = receipt.sequence,
            value = receipt.value,
            "receipt emitted"
        );
        Ok(receipt)
    }

    /// Emit `1..=max_batch_size` receipts and commit to them with a Merkle root.
    ///
    /// Either every receipt is written or none is.
    pub fn emit_batch(
        &self,
        batch: Vec<EmitReceiptParams>,
        now: i64,
    ) -> RailResult<(BatchSummary, Vec<ActionReceipt>)> {
        if batch.is_empty() {
            return Err(RailError::EmptyBatch);
        }
        if batch.len() > self.config.max_batch_size {
            return Err(RailError::BatchTooLarge {
                size: batch.len(),
                max: self.config.max_batch_size,
            });
        }
        for params in &batch {
            self.check_offchain_ref(params)?;
        }

        let _exclusive = self.gate.write();

        let mut seen = HashSet::with_capacity(batch.len());
        for params in &batch {
            let id = params.receipt_id();
            if !seen.insert(id) || self.receipts.contains(&id) {
                tracing::warn!(receipt = %id, nonce = params.nonce, "duplicate receipt in batch");
                return Err(RailError::ReceiptAlreadyExists {
                    nonce: params.nonce,
                });
            }
        }

        // Sequence numbers and timestamps are known up front, so the root can be
        // computed before anything is written.
        let mut next_sequence = HashMap::new();
        let mut leaves = Vec::with_capacity(batch.len());
        let mut drafts = Vec::with_capacity(batch.len());
        for params in batch {
            let seq = next_sequence.entry(params.agent).or_insert_with(|| {
                self.by_agent
                    .with(&params.agent, |i| i.receipt_count)
                    .unwrap_or(0)
            });
            *seq += 1;
            let draft = ActionReceipt::from_params(params.clone(), *seq, now, None);
            leaves.push(draft.receipt_hash());
            drafts.push(params);
        }
        let root = merkle_root(&leaves);

        let mut receipts = Vec::with_capacity(drafts.len());
        for params in drafts {
            receipts.push(self.append(params, Some(root), now)?);
        }

        let summary = BatchSummary {
            merkle_root: root,
            receipt_count: receipts.len() as u32,
            first_receipt: receipts[0].id,
            last_receipt: receipts[receipts.len() - 1].id,
            created_at: now,
            total_value: receipts
                .iter()
                .fold(0u64, |acc, r| acc.saturating_add(r.value)),
            leaves,
        };
        self.batches.upsert_with(root, || summary.clone(), |_| ());
        tracing::info!(
            root = %hex_prefix(&root),
            receipts = summary.receipt_count,
            total_value = summary.total_value,
            "receipt batch emitted"
        );
        Ok((summary, receipts))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Receipt by id, or `ReceiptNotFound`
    pub fn verify_receipt(&self, id: &ReceiptId) -> RailResult<ActionReceipt> {
        let receipt = self.receipts.get(id).ok_or(RailError::ReceiptNotFound)?;
        tracing::debug!(
            receipt = %id,
            principal = %receipt.principal,
            agent = %receipt.agent,
            value = receipt.value,
            "receipt verified"
        );
        Ok(receipt)
    }

    /// Every receipt emitted by `agent`, in sequence order
    pub fn receipts_for_agent(&self, agent: &AgentId) -> Vec<ActionReceipt> {
        let mut out = self.receipts.filter_cloned(|r| r.agent == *agent);
        out.sort_by_key(|r| r.sequence);
        out
    }

    /// Every receipt authorized by `principal`, oldest first
    pub fn receipts_for_principal(&self, principal: &Address) -> Vec<ActionReceipt> {
        let mut out = self.receipts.filter_cloned(|r| r.principal == *principal);
        out.sort_by_key(|r| (r.timestamp, r.agent, r.sequence));
        out
    }

    /// Running totals for `agent`
    pub fn agent_index(&self, agent: &AgentId) -> ReceiptIndex {
        self.by_agent.get(agent).unwrap_or_default()
    }

    /// Running totals for `principal`
    pub fn principal_index(&self, principal: &Address) -> ReceiptIndex {
        self.by_principal.get(principal).unwrap_or_default()
    }

    /// Batch summary by root
    pub fn batch(&self, root: &Hash32) -> Option<BatchSummary> {
        self.batches.get(root)
    }

    /// Inclusion proof for a receipt emitted in a batch
    pub fn batch_proof(&self, id: &ReceiptId) -> RailResult<(Hash32, MerkleProof)> {
        let receipt = self.verify_receipt(id)?;
        let root = receipt.batch_root.ok_or(RailError::ReceiptNotFound)?;
        let summary = self.batch(&root).ok_or(RailError::ReceiptNotFound)?;
        let leaf = receipt.receipt_hash();
        let position = summary
            .leaves
            .iter()
            .position(|l| *l == leaf)
            .ok_or(RailError::ReceiptNotFound)?;
        let proof = merkle_proof(&summary.leaves, position).ok_or(RailError::ReceiptNotFound)?;
        Ok((root, proof))
    }

    /// Number of receipts stored
    pub fn len(&self) -> usize {
        self.receipts.len()
    }

    /// True if no receipt has been emitted
    pub fn is_empty(&self) -> bool {
        self.receipts.is_empty()
    }
}

/// Check that `receipt` is committed to by `root` through `proof`.
pub fn verify_batch_inclusion(receipt: &ActionReceipt, root: &Hash32, proof: &MerkleProof) -> bool {
    verify_merkle_proof(proof, root, &receipt.receipt_hash())
}

fn hex_prefix(bytes: &Hash32) -> String {
    bytes[..8].iter().map(|b| format!("{b:02x}")).collect()
}
