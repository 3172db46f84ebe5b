//! Human-score lookup seam
//!
//! The agent registry gates registration on a principal's score but must not
//! depend on the attestation crate. Anything that can answer "what is this
//! wallet's effective score at `now`" implements [`HumanScoreSource`].

use crate::identifiers::Address;
use std::collections::HashMap;

/// Source of effective human scores
pub trait HumanScoreSource: Send + Sync {
    /// Effective score of `wallet` at `now`, or `None` if it has no profile.
    fn human_score(&self, wallet: &Address, now: i64) -> Option<u16>;
}

/// Fixed table of scores, for wiring tests and offline tools.
impl HumanScoreSource for HashMap<Address, u16> {
    fn human_score(&self, wallet: &Address, _now: i64) -> Option<u16> {
        self.get(wallet).copied()
    }
}

impl<T: HumanScoreSource + ?Sized> HumanScoreSource for &T {
    fn human_score(&self, wallet: &Address, now: i64) -> Option<u16> {
        (**self).human_score(wallet, now)
    }
}

impl<T: HumanScoreSource + ?Sized> HumanScoreSource for std::sync::Arc<T> {
    fn human_score(&self, wallet: &Address, now: i64) -> Option<u16> {
        (**self).human_score(wallet, now)
    }
}
