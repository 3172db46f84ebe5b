//! Property test strategies for HumanRail types

use humanrail_core::{ActionKind, Address, Hash32};
use proptest::prelude::*;

pub use proptest;

/// Arbitrary 32-byte address (not necessarily a valid curve point)
pub fn arb_address() -> impl Strategy<Value = Address> {
    any::<[u8; 32]>().prop_map(Address)
}

/// Arbitrary 32-byte digest
pub fn arb_hash() -> impl Strategy<Value = Hash32> {
    any::<[u8; 32]>()
}

/// Attestation weight in `1..=max`
pub fn arb_weight(max: u16) -> impl Strategy<Value = u16> {
    1..=max
}

/// Spend amount in `1..=max`
pub fn arb_amount(max: u64) -> impl Strategy<Value = u64> {
    1..=max
}

/// Any action kind
pub fn arb_action() -> impl Strategy<Value = ActionKind> {
    proptest::sample::select(ActionKind::ALL.to_vec())
}
