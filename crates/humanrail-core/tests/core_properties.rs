//! Property tests for core primitives
//!
//! - Merkle proofs verify for every leaf of every tree size and fail for others
//! - Day numbering is monotone and changes exactly at day boundaries
//! - Entity ids round-trip through their hex form

use humanrail_core::crypto::{hash, merkle_proof, merkle_root, verify_merkle_proof};
use humanrail_core::{day_number, Address, CapabilityId, SECONDS_PER_DAY};
use proptest::prelude::*;

fn arb_leaves() -> impl Strategy<Value = Vec<[u8; 32]>> {
    prop::collection::vec(any::<[u8; 32]>(), 1..40)
}

proptest! {
    /// Property: every leaf has a proof that verifies against the root
    #[test]
    fn merkle_every_leaf_included(leaves in arb_leaves()) {
        let root = merkle_root(&leaves);
        for (i, leaf) in leaves.iter().enumerate() {
            let proof = merkle_proof(&leaves, i).unwrap();
            prop_assert!(verify_merkle_proof(&proof, &root, leaf));
        }
    }

    /// Property: a proof does not verify a leaf that was never in the tree
    #[test]
    fn merkle_foreign_leaf_rejected(leaves in arb_leaves(), idx in any::<prop::sample::Index>()) {
        let i = idx.index(leaves.len());
        let root = merkle_root(&leaves);
        let proof = merkle_proof(&leaves, i).unwrap();
        let foreign = hash(b"not a member");
        prop_assume!(!leaves.contains(&foreign));
        prop_assert!(!verify_merkle_proof(&proof, &root, &foreign));
    }

    /// Property: day numbers never decrease and advance only at multiples of a day
    #[test]
    fn day_number_monotone(a in 0i64..4_000_000_000, delta in 0i64..1_000_000) {
        let b = a + delta;
        prop_assert!(day_number(a) <= day_number(b));
        let same_day = a / SECONDS_PER_DAY == b / SECONDS_PER_DAY;
        prop_assert_eq!(same_day, day_number(a) == day_number(b));
    }

    /// Property: ids survive Display -> FromStr
    #[test]
    fn id_hex_roundtrip(bytes in any::<[u8; 32]>()) {
        let addr = Address(bytes);
        prop_assert_eq!(addr.to_string().parse::<Address>().unwrap(), addr);
        let id = CapabilityId(bytes);
        prop_assert_eq!(id.to_string().parse::<CapabilityId>().unwrap(), id);
    }
}
