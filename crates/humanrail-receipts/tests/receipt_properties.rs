//! Receipt ledger properties
//!
//! - Sequence numbers are gap-free and strictly increasing per agent, whether
//!   receipts arrive singly, in batches, or from concurrent emitters
//! - Every batched receipt proves inclusion in its batch root

use humanrail_core::config::ReceiptConfig;
use humanrail_core::{AgentId, CapabilityId};
use humanrail_receipts::{verify_batch_inclusion, ReceiptLedger};
use humanrail_testkit::{receipt_params, KeyTestFixture, TEST_NOW};
use proptest::prelude::*;

fn principal() -> humanrail_core::Address {
    KeyTestFixture::from_seed_string("principal").address()
}

#[test]
fn concurrent_emitters_get_distinct_sequences() {
    let ledger = ReceiptLedger::new(ReceiptConfig::default());
    let agent = AgentId([1; 32]);

    std::thread::scope(|s| {
        for worker in 0..8u64 {
            let ledger = &ledger;
            s.spawn(move || {
                for i in 0..25u64 {
                    let nonce = worker * 1_000 + i;
                    ledger
                        .emit(
                            receipt_params(principal(), agent, CapabilityId([2; 32]), 1, nonce),
                            TEST_NOW,
                        )
                        .unwrap();
                }
            });
        }
        s.spawn(|| {
            for b in 0..5u64 {
                let batch = (0..4)
                    .map(|i| {
                        receipt_params(
                            principal(),
                            agent,
                            CapabilityId([2; 32]),
                            1,
                            100_000 + b * 10 + i,
                        )
                    })
                    .collect();
                ledger.emit_batch(batch, TEST_NOW).unwrap();
            }
        });
    });

    let receipts = ledger.receipts_for_agent(&agent);
    assert_eq!(receipts.len(), 220);
    for (i, r) in receipts.iter().enumerate() {
        assert_eq!(r.sequence, i as u64 + 1);
    }
    assert_eq!(ledger.agent_index(&agent).receipt_count, 220);
}

proptest! {
    /// Property: mixed single and batch emission yields sequences 1..=n per agent,
    /// and each batch member verifies against its root
    #[test]
    fn sequences_and_batch_proofs(
        plan in prop::collection::vec((any::<bool>(), 1usize..=10, 0u8..3), 1..12)
    ) {
        let ledger = ReceiptLedger::new(ReceiptConfig::default());
        let mut nonce = 0u64;
        let mut expected = [0u64; 3];

        for (batched, size, agent_byte) in plan {
            let agent = AgentId([agent_byte; 32]);
            if batched {
                let batch = (0..size)
                    .map(|_| {
                        nonce += 1;
                        receipt_params(principal(), agent, CapabilityId([0; 32]), 1, nonce)
                    })
                    .collect();
                let (summary, receipts) = ledger.emit_batch(batch, TEST_NOW).unwrap();
                for r in &receipts {
                    let (root, proof) = ledger.batch_proof(&r.id).unwrap();
                    prop_assert_eq!(root, summary.merkle_root);
                    prop_assert!(verify_batch_inclusion(r, &root, &proof));
                }
            } else {
                nonce += 1;
                ledger
                    .emit(
                        receipt_params(principal(), agent, CapabilityId([0; 32]), 1, nonce),
                        TEST_NOW,
                    )
                    .unwrap();
            }
            expected[agent_byte as usize] += if batched { size as u64 } else { 1 };
        }

        for agent_byte in 0..3u8 {
            let agent = AgentId([agent_byte; 32]);
            let seqs: Vec<u64> = ledger
                .receipts_for_agent(&agent)
                .iter()
                .map(|r| r.sequence)
                .collect();
            let want: Vec<u64> = (1..=expected[agent_byte as usize]).collect();
            prop_assert_eq!(seqs, want);
        }
    }
}
