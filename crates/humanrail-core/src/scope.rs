//! Capability scope bitmasks
//!
//! Capabilities carry two fixed-width masks, `allowed_programs` and
//! `allowed_assets`. Bit positions are part of the stored format and must not
//! be renumbered.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Program scope bits
pub mod program {
    /// Escrowed human task payments
    pub const HUMAN_PAY: u64 = 1 << 0;
    /// Data request / task response flows
    pub const DATA_BLINK: u64 = 1 << 1;
    /// Plain token transfers
    pub const TOKEN_TRANSFER: u64 = 1 << 2;
    /// NFT transfers
    pub const NFT_TRANSFER: u64 = 1 << 3;
    /// Swaps
    pub const SWAP: u64 = 1 << 4;
    /// Staking
    pub const STAKE: u64 = 1 << 5;
    /// Governance votes
    pub const GOVERNANCE: u64 = 1 << 6;
    /// Document signing
    pub const DOCUMENT_SIGN: u64 = 1 << 7;
    /// Every defined program bit
    pub const ALL: u64 = (1 << 8) - 1;
}

/// Asset scope bits
pub mod asset {
    /// Native SOL
    pub const SOL: u64 = 1 << 0;
    /// USDC
    pub const USDC: u64 = 1 << 1;
    /// USDT
    pub const USDT: u64 = 1 << 2;
    /// Any fungible SPL token
    pub const ANY_SPL_TOKEN: u64 = 1 << 3;
    /// Any NFT
    pub const ANY_NFT: u64 = 1 << 4;
    /// Every defined asset bit
    pub const ALL: u64 = (1 << 5) - 1;
}

/// True iff every bit of `required` is set in `allowed`.
///
/// A zero `required` mask is trivially satisfied.
#[inline]
pub fn mask_allows(allowed: u64, required: u64) -> bool {
    required & allowed == required
}

/// Kind of action an agent performs under a capability.
///
/// Closed set. Each kind maps to one program scope bit and has a stable
/// one-byte code used in usage records and receipt hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Human task payment
    Payment,
    /// Response to a data/task request
    TaskResponse,
    /// Token transfer
    TokenTransfer,
    /// NFT transfer
    NftTransfer,
    /// Swap
    Swap,
    /// Stake
    Stake,
    /// Governance vote
    Governance,
    /// Document signature
    DocumentSign,
}

impl ActionKind {
    /// Every kind, in code order
    pub const ALL: [ActionKind; 8] = [
        ActionKind::Payment,
        ActionKind::TaskResponse,
        ActionKind::TokenTransfer,
        ActionKind::NftTransfer,
        ActionKind::Swap,
        ActionKind::Stake,
        ActionKind::Governance,
        ActionKind::DocumentSign,
    ];

    /// Program scope bit this kind requires
    pub const fn program_bit(self) -> u64 {
        match self {
            ActionKind::Payment => program::HUMAN_PAY,
            ActionKind::TaskResponse => program::DATA_BLINK,
            ActionKind::TokenTransfer => program::TOKEN_TRANSFER,
            ActionKind::NftTransfer => program::NFT_TRANSFER,
            ActionKind::Swap => program::SWAP,
            ActionKind::Stake => program::STAKE,
            ActionKind::Governance => program::GOVERNANCE,
            ActionKind::DocumentSign => program::DOCUMENT_SIGN,
        }
    }

    /// Stable one-byte code
    pub const fn code(self) -> u8 {
        match self {
            ActionKind::Payment => 0,
            ActionKind::TaskResponse => 1,
            ActionKind::TokenTransfer => 2,
            ActionKind::NftTransfer => 3,
            ActionKind::Swap => 4,
            ActionKind::Stake => 5,
            ActionKind::Governance => 6,
            ActionKind::DocumentSign => 7,
        }
    }

    /// Inverse of [`ActionKind::code`]
    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ActionKind::Payment => "payment",
            ActionKind::TaskResponse => "task_response",
            ActionKind::TokenTransfer => "token_transfer",
            ActionKind::NftTransfer => "nft_transfer",
            ActionKind::Swap => "swap",
            ActionKind::Stake => "stake",
            ActionKind::Governance => "governance",
            ActionKind::DocumentSign => "document_sign",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_allows() {
        let allowed = program::HUMAN_PAY | program::SWAP;
        assert!(mask_allows(allowed, program::SWAP));
        assert!(!mask_allows(allowed, program::STAKE));
        assert!(!mask_allows(allowed, program::SWAP | program::STAKE));
        assert!(mask_allows(0, 0));
    }

    #[test]
    fn test_codes_roundtrip_and_bits_distinct() {
        let mut seen = 0u64;
        for kind in ActionKind::ALL {
            assert_eq!(ActionKind::from_code(kind.code()), Some(kind));
            assert_eq!(seen & kind.program_bit(), 0);
            seen |= kind.program_bit();
        }
        assert_eq!(seen, program::ALL);
        assert_eq!(ActionKind::from_code(8), None);
    }
}
