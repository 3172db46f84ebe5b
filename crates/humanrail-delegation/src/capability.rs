//! Capability model and the pure validation rule set
//!
//! A [`Capability`] is a scoped, rate-limited, time-bound grant from a
//! principal to an agent. [`validate_capability`] decides whether one action
//! is currently authorized under it. It reads nothing but its arguments, so
//! it can run against any snapshot.

use crate::freeze::FreezeRecord;
use humanrail_core::config::{DelegationConfig, MAX_BPS};
use humanrail_core::scope::mask_allows;
use humanrail_core::{
    day_number, ActionKind, Address, AgentId, CapabilityId, Hash32, KeyedArena, RailError,
    RailResult, UsageId,
};
use serde::{Deserialize, Serialize};

/// Alias kept for call sites that name the capability error domain
pub type CapabilityError = RailError;

/// Capability records, shared by the engine and the dispute ledger
pub type CapabilityStore = KeyedArena<CapabilityId, Capability>;

/// Context flags returned with a successful validation
pub mod flags {
    /// Destination allowlist is enforced
    pub const ALLOWLIST_ENFORCED: u64 = 1 << 16;
    /// A cooldown is configured and the capability has been used before
    pub const IN_COOLDOWN: u64 = 1 << 17;
    /// Post-action daily spend is at least 80% of the daily limit
    pub const NEAR_DAILY_LIMIT: u64 = 1 << 18;
    /// Post-action total spend is at least 80% of the total limit
    pub const NEAR_TOTAL_LIMIT: u64 = 1 << 19;
}

const NEAR_LIMIT_PERCENT: u128 = 80;

/// Stored capability status. `Expired` is never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CapabilityStatus {
    /// Usable within its bounds
    #[default]
    Active,
    /// Terminal
    Revoked,
    /// Administratively frozen
    Frozen,
    /// Under dispute
    Disputed,
}

/// Status as observed at a given time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EffectiveStatus {
    /// Active and not past `expires_at`
    Active,
    /// Active but past `expires_at`
    Expired,
    /// Revoked
    Revoked,
    /// Frozen
    Frozen,
    /// Disputed
    Disputed,
}

/// A delegation grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    /// Derived from `(principal, agent, nonce)`
    pub id: CapabilityId,
    /// Granting principal
    pub principal: Address,
    /// Grantee
    pub agent: AgentId,
    /// Program scope bits
    pub allowed_programs: u64,
    /// Asset scope bits
    pub allowed_assets: u64,
    /// Ceiling per action
    pub per_tx_limit: u64,
    /// Ceiling per UTC day
    pub daily_limit: u64,
    /// Lifetime ceiling
    pub total_limit: u64,
    /// Execution slippage bound
    pub max_slippage_bps: u16,
    /// Execution fee bound
    pub max_fee: u64,
    /// Start of validity
    pub valid_from: i64,
    /// End of validity (exclusive)
    pub expires_at: i64,
    /// Minimum gap between uses
    pub cooldown_seconds: u32,
    /// Sensitivity class
    pub risk_tier: u8,
    /// Stored status
    pub status: CapabilityStatus,
    /// Issue time
    pub issued_at: i64,
    /// Last recorded use, 0 if never used
    pub last_used_at: i64,
    /// Spend on `current_day`
    pub daily_spent: u64,
    /// Day `daily_spent` refers to
    pub current_day: u32,
    /// Lifetime spend
    pub total_spent: u64,
    /// Recorded uses
    pub use_count: u64,
    /// Enforce `destination_allowlist`
    pub enforce_allowlist: bool,
    /// Permitted destinations
    pub destination_allowlist: Vec<Address>,
    /// Reason for the open dispute
    pub dispute_reason: Option<Hash32>,
    /// Disambiguates grants on one `(principal, agent)` edge
    pub nonce: u64,
}

impl Capability {
    /// Status at `now`, with expiry computed from `expires_at`.
    pub fn effective_status(&self, now: i64) -> EffectiveStatus {
        match self.status {
            CapabilityStatus::Revoked => EffectiveStatus::Revoked,
            CapabilityStatus::Frozen => EffectiveStatus::Frozen,
            CapabilityStatus::Disputed => EffectiveStatus::Disputed,
            CapabilityStatus::Active if now >= self.expires_at => EffectiveStatus::Expired,
            CapabilityStatus::Active => EffectiveStatus::Active,
        }
    }

    /// Daily spend as seen at `now`; zero once the day has rolled over.
    pub fn effective_daily_spent(&self, now: i64) -> u64 {
        if day_number(now) == self.current_day {
            self.daily_spent
        } else {
            0
        }
    }

    /// Destination check, honoring `enforce_allowlist`
    pub fn is_destination_allowed(&self, destination: Option<&Address>) -> bool {
        if !self.enforce_allowlist {
            return true;
        }
        destination.is_some_and(|d| self.destination_allowlist.contains(d))
    }

    /// Program scope check
    pub fn is_program_allowed(&self, program_bits: u64) -> bool {
        mask_allows(self.allowed_programs, program_bits)
    }

    /// Asset scope check
    pub fn is_asset_allowed(&self, asset_bits: u64) -> bool {
        mask_allows(self.allowed_assets, asset_bits)
    }

    /// Seconds left before the next use is allowed, if any
    pub fn cooldown_remaining(&self, now: i64) -> Option<i64> {
        if self.last_used_at == 0 || self.cooldown_seconds == 0 {
            return None;
        }
        let elapsed = now.saturating_sub(self.last_used_at);
        let cooldown = i64::from(self.cooldown_seconds);
        (elapsed < cooldown).then(|| cooldown - elapsed)
    }

    /// Roll the daily window forward if `now` is on a new day.
    pub(crate) fn roll_day(&mut self, now: i64) {
        let today = day_number(now);
        if today != self.current_day {
            self.daily_spent = 0;
            self.current_day = today;
        }
    }
}

/// Input to capability issuance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueCapabilityParams {
    /// Grantee
    pub agent: AgentId,
    /// Program scope bits
    pub allowed_programs: u64,
    /// Asset scope bits
    pub allowed_assets: u64,
    /// Ceiling per action
    pub per_tx_limit: u64,
    /// Ceiling per day
    pub daily_limit: u64,
    /// Lifetime ceiling
    pub total_limit: u64,
    /// Slippage bound, `0..=10000`
    pub max_slippage_bps: u16,
    /// Fee bound
    pub max_fee: u64,
    /// Start of validity
    pub valid_from: i64,
    /// End of validity
    pub expires_at: i64,
    /// Minimum gap between uses
    pub cooldown_seconds: u32,
    /// Sensitivity class
    pub risk_tier: u8,
    /// Permitted destinations; enforcement is on iff non-empty
    pub destination_allowlist: Vec<Address>,
    /// Disambiguates grants on one edge
    pub nonce: u64,
}

impl IssueCapabilityParams {
    /// Check bounds and internal consistency at `now`.
    pub fn validate(&self, config: &DelegationConfig, now: i64) -> RailResult<()> {
        if self.expires_at <= now || self.valid_from >= self.expires_at {
            return Err(RailError::InvalidExpiry);
        }
        if self.per_tx_limit > self.daily_limit || self.daily_limit > self.total_limit {
            return Err(RailError::invalid_limits(
                "expected per_tx_limit <= daily_limit <= total_limit",
            ));
        }
        if self.max_slippage_bps > MAX_BPS {
            return Err(RailError::invalid_limits("max_slippage_bps above 10000"));
        }
        if self.risk_tier > config.max_risk_tier {
            return Err(RailError::invalid_limits(format!(
                "risk_tier {} above {}",
                self.risk_tier, config.max_risk_tier
            )));
        }
        if self.destination_allowlist.len() > config.max_destination_allowlist {
            return Err(RailError::TooManyDestinations {
                count: self.destination_allowlist.len(),
                max: config.max_destination_allowlist,
            });
        }
        Ok(())
    }

    /// Build the stored capability. Counters start at zero with `current_day` set to today.
    pub fn into_capability(self, principal: Address, now: i64) -> Capability {
        Capability {
            id: CapabilityId::derive(&principal, &self.agent, self.nonce),
            principal,
            agent: self.agent,
            allowed_programs: self.allowed_programs,
            allowed_assets: self.allowed_assets,
            per_tx_limit: self.per_tx_limit,
            daily_limit: self.daily_limit,
            total_limit: self.total_limit,
            max_slippage_bps: self.max_slippage_bps,
            max_fee: self.max_fee,
            valid_from: self.valid_from,
            expires_at: self.expires_at,
            cooldown_seconds: self.cooldown_seconds,
            risk_tier: self.risk_tier,
            status: CapabilityStatus::Active,
            issued_at: now,
            last_used_at: 0,
            daily_spent: 0,
            current_day: day_number(now),
            total_spent: 0,
            use_count: 0,
            enforce_allowlist: !self.destination_allowlist.is_empty(),
            destination_allowlist: self.destination_allowlist,
            dispute_reason: None,
            nonce: self.nonce,
        }
    }
}

/// One action an agent wants to take
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Kind of action; selects the program scope bit
    pub action: ActionKind,
    /// Asset scope bits touched
    pub asset: u64,
    /// Value in the smallest asset unit
    pub value: u64,
    /// Destination, if any
    pub destination: Option<Address>,
    /// Tier the integration requires
    pub required_risk_tier: Option<u8>,
    /// Expected slippage
    pub slippage_bps: Option<u16>,
    /// Expected fee
    pub fee: Option<u64>,
}

impl ActionRequest {
    /// Request for `value` of `asset` with no optional bounds
    pub fn new(action: ActionKind, asset: u64, value: u64) -> Self {
        Self {
            action,
            asset,
            value,
            destination: None,
            required_risk_tier: None,
            slippage_bps: None,
            fee: None,
        }
    }

    /// Set the destination
    pub fn to(mut self, destination: Address) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Require a minimum risk tier
    pub fn with_required_tier(mut self, tier: u8) -> Self {
        self.required_risk_tier = Some(tier);
        self
    }

    /// Declare expected slippage and fee
    pub fn with_execution(mut self, slippage_bps: u16, fee: u64) -> Self {
        self.slippage_bps = Some(slippage_bps);
        self.fee = Some(fee);
        self
    }
}

/// Advisory figures from a successful validation.
///
/// Callers must not use these as the authorization decision; `record_usage`
/// is authoritative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    /// Daily budget left after this action
    pub remaining_daily: u64,
    /// Lifetime budget left after this action
    pub remaining_total: u64,
    /// Bitwise OR of [`flags`]
    pub context_flags: u64,
}

impl ValidationOutcome {
    /// Whether a flag bit is set
    pub fn has_flag(&self, flag: u64) -> bool {
        self.context_flags & flag == flag
    }
}

fn at_least_80_percent(spent: u64, limit: u64) -> bool {
    limit > 0 && u128::from(spent) * 100 >= u128::from(limit) * NEAR_LIMIT_PERCENT
}

/// Decide whether `request` is authorized under `capability` at `now`.
///
/// Checks run in a fixed order and the first failure wins:
/// freeze, status/expiry, not-yet-valid, program then asset scope, per-tx,
/// daily, total, allowlist, cooldown, risk tier, then slippage and fee.
pub fn validate_capability(
    capability: &Capability,
    freeze: Option<&FreezeRecord>,
    request: &ActionRequest,
    now: i64,
) -> RailResult<ValidationOutcome> {
    if freeze.is_some_and(|f| f.is_active) {
        return Err(RailError::AgentFrozen);
    }

    match capability.effective_status(now) {
        EffectiveStatus::Active => {}
        EffectiveStatus::Revoked => return Err(RailError::CapabilityRevoked),
        EffectiveStatus::Frozen => return Err(RailError::CapabilityFrozen),
        EffectiveStatus::Disputed => return Err(RailError::CapabilityDisputed),
        EffectiveStatus::Expired => return Err(RailError::CapabilityExpired),
    }

    if now < capability.valid_from {
        return Err(RailError::CapabilityNotYetValid);
    }

    if !capability.is_program_allowed(request.action.program_bit()) {
        return Err(RailError::ProgramNotAllowed);
    }
    if !capability.is_asset_allowed(request.asset) {
        return Err(RailError::AssetNotAllowed);
    }

    if request.value > capability.per_tx_limit {
        return Err(RailError::PerTxLimitExceeded {
            requested: request.value,
            limit: capability.per_tx_limit,
        });
    }

    let daily_spent = capability.effective_daily_spent(now);
    let new_daily = match daily_spent.checked_add(request.value) {
        Some(sum) if sum <= capability.daily_limit => sum,
        _ => {
            return Err(RailError::DailyLimitExceeded {
                requested: request.value,
                remaining: capability.daily_limit.saturating_sub(daily_spent),
            })
        }
    };

    let new_total = match capability.total_spent.checked_add(request.value) {
        Some(sum) if sum <= capability.total_limit => sum,
        _ => {
            return Err(RailError::TotalLimitExceeded {
                requested: request.value,
                remaining: capability.total_limit.saturating_sub(capability.total_spent),
            })
        }
    };

    if !capability.is_destination_allowed(request.destination.as_ref()) {
        return Err(RailError::DestinationNotAllowed);
    }

    if let Some(remaining_secs) = capability.cooldown_remaining(now) {
        return Err(RailError::CooldownNotElapsed { remaining_secs });
    }

    if let Some(required) = request.required_risk_tier {
        if capability.risk_tier < required {
            return Err(RailError::RiskTierExceeded {
                tier: capability.risk_tier,
                required,
            });
        }
    }

    if request
        .slippage_bps
        .is_some_and(|s| s > capability.max_slippage_bps)
    {
        return Err(RailError::SlippageExceeded);
    }
    if request.fee.is_some_and(|f| f > capability.max_fee) {
        return Err(RailError::FeeExceeded);
    }

    let mut context_flags = 0;
    if capability.enforce_allowlist {
        context_flags |= flags::ALLOWLIST_ENFORCED;
    }
    if capability.cooldown_seconds > 0 && capability.last_used_at != 0 {
        context_flags |= flags::IN_COOLDOWN;
    }
    if at_least_80_percent(new_daily, capability.daily_limit) {
        context_flags |= flags::NEAR_DAILY_LIMIT;
    }
    if at_least_80_percent(new_total, capability.total_limit) {
        context_flags |= flags::NEAR_TOTAL_LIMIT;
    }

    Ok(ValidationOutcome {
        remaining_daily: capability.daily_limit - new_daily,
        remaining_total: capability.total_limit - new_total,
        context_flags,
    })
}

/// Immutable record of one recorded use
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Derived from `(capability, sequence)`
    pub id: UsageId,
    /// Capability used
    pub capability: CapabilityId,
    /// Acting agent
    pub agent: AgentId,
    /// Amount spent
    pub amount: u64,
    /// Kind of action
    pub action: ActionKind,
    /// Destination, if any
    pub destination: Option<Address>,
    /// Record time
    pub used_at: i64,
    /// External transaction reference
    pub tx_ref: Hash32,
    /// `use_count` after this use
    pub sequence: u64,
}

/// Input to `record_usage`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageParams {
    /// Acting agent; must hold the capability
    pub agent: AgentId,
    /// Amount spent
    pub amount: u64,
    /// Kind of action
    pub action: ActionKind,
    /// Destination, if any
    pub destination: Option<Address>,
    /// External transaction reference
    pub tx_ref: Hash32,
}

/// Entry written when a principal revokes a capability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationEntry {
    /// Revoked capability
    pub capability: CapabilityId,
    /// Revoking principal
    pub revoked_by: Address,
    /// Revocation time
    pub revoked_at: i64,
    /// Commitment to the reason
    pub reason_hash: Hash32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use humanrail_core::scope::{asset, program};
    use humanrail_core::SECONDS_PER_DAY;

    const NOW: i64 = 1_700_000_000;

    fn capability() -> Capability {
        IssueCapabilityParams {
            agent: AgentId([2; 32]),
            allowed_programs: program::HUMAN_PAY | program::SWAP,
            allowed_assets: asset::USDC,
            per_tx_limit: 100,
            daily_limit: 500,
            total_limit: 1_000,
            max_slippage_bps: 50,
            max_fee: 10,
            valid_from: NOW - 10,
            expires_at: NOW + 30 * SECONDS_PER_DAY,
            cooldown_seconds: 0,
            risk_tier: 2,
            destination_allowlist: Vec::new(),
            nonce: 0,
        }
        .into_capability(Address([1; 32]), NOW)
    }

    fn pay(value: u64) -> ActionRequest {
        ActionRequest::new(ActionKind::Payment, asset::USDC, value)
    }

    #[test]
    fn test_happy_path_remaining() {
        let outcome = validate_capability(&capability(), None, &pay(100), NOW).unwrap();
        assert_eq!(outcome.remaining_daily, 400);
        assert_eq!(outcome.remaining_total, 900);
        assert_eq!(outcome.context_flags, 0);
    }

    #[test]
    fn test_frozen_beats_everything() {
        let mut cap = capability();
        cap.status = CapabilityStatus::Revoked;
        let freeze = FreezeRecord::active(cap.principal, cap.agent, NOW, [0; 32]);
        assert_eq!(
            validate_capability(&cap, Some(&freeze), &pay(1_000_000), NOW + 365 * SECONDS_PER_DAY),
            Err(RailError::AgentFrozen)
        );
    }

    #[test]
    fn test_stored_status_precedes_expiry() {
        let mut cap = capability();
        let later = cap.expires_at + 1;
        assert_eq!(
            validate_capability(&cap, None, &pay(1), later),
            Err(RailError::CapabilityExpired)
        );
        cap.status = CapabilityStatus::Disputed;
        assert_eq!(
            validate_capability(&cap, None, &pay(1), later),
            Err(RailError::CapabilityDisputed)
        );
        cap.status = CapabilityStatus::Frozen;
        assert_eq!(
            validate_capability(&cap, None, &pay(1), NOW),
            Err(RailError::CapabilityFrozen)
        );
        assert_eq!(cap.effective_status(later), EffectiveStatus::Frozen);
    }

    #[test]
    fn test_expiry_boundary_is_exclusive() {
        let cap = capability();
        assert!(validate_capability(&cap, None, &pay(1), cap.expires_at - 1).is_ok());
        assert_eq!(
            validate_capability(&cap, None, &pay(1), cap.expires_at),
            Err(RailError::CapabilityExpired)
        );
    }

    #[test]
    fn test_not_yet_valid() {
        let cap = capability();
        assert_eq!(
            validate_capability(&cap, None, &pay(1), cap.valid_from - 1),
            Err(RailError::CapabilityNotYetValid)
        );
    }

    #[test]
    fn test_scope_program_before_asset() {
        let cap = capability();
        let req = ActionRequest::new(ActionKind::Stake, asset::SOL, 1);
        assert_eq!(
            validate_capability(&cap, None, &req, NOW),
            Err(RailError::ProgramNotAllowed)
        );
        let req = ActionRequest::new(ActionKind::Swap, asset::SOL, 1);
        assert_eq!(
            validate_capability(&cap, None, &req, NOW),
            Err(RailError::AssetNotAllowed)
        );
        let req = ActionRequest::new(ActionKind::Swap, 0, 1);
        assert!(validate_capability(&cap, None, &req, NOW).is_ok());
    }

    #[test]
    fn test_limits_in_order() {
        let mut cap = capability();
        assert!(matches!(
            validate_capability(&cap, None, &pay(101), NOW),
            Err(RailError::PerTxLimitExceeded { requested: 101, limit: 100 })
        ));

        cap.daily_spent = 450;
        assert_eq!(
            validate_capability(&cap, None, &pay(100), NOW),
            Err(RailError::DailyLimitExceeded {
                requested: 100,
                remaining: 50
            })
        );

        // stale daily spend from yesterday does not count
        cap.current_day -= 1;
        cap.total_spent = 950;
        assert_eq!(
            validate_capability(&cap, None, &pay(100), NOW),
            Err(RailError::TotalLimitExceeded {
                requested: 100,
                remaining: 50
            })
        );
    }

    #[test]
    fn test_allowlist() {
        let dest = Address([7; 32]);
        let mut cap = capability();
        cap.destination_allowlist = vec![dest];
        cap.enforce_allowlist = true;
        assert_eq!(
            validate_capability(&cap, None, &pay(1).to(Address([8; 32])), NOW),
            Err(RailError::DestinationNotAllowed)
        );
        assert_eq!(
            validate_capability(&cap, None, &pay(1), NOW),
            Err(RailError::DestinationNotAllowed)
        );
        let ok = validate_capability(&cap, None, &pay(1).to(dest), NOW).unwrap();
        assert!(ok.has_flag(flags::ALLOWLIST_ENFORCED));
    }

    #[test]
    fn test_cooldown_skipped_when_never_used() {
        let mut cap = capability();
        cap.cooldown_seconds = 60;
        assert!(validate_capability(&cap, None, &pay(1), NOW).is_ok());

        cap.last_used_at = NOW - 20;
        assert_eq!(
            validate_capability(&cap, None, &pay(1), NOW),
            Err(RailError::CooldownNotElapsed { remaining_secs: 40 })
        );
        let ok = validate_capability(&cap, None, &pay(1), NOW + 40).unwrap();
        assert!(ok.has_flag(flags::IN_COOLDOWN));
    }

    #[test]
    fn test_risk_tier_then_execution_bounds() {
        let cap = capability();
        assert_eq!(
            validate_capability(&cap, None, &pay(1).with_required_tier(3), NOW),
            Err(RailError::RiskTierExceeded {
                tier: 2,
                required: 3
            })
        );
        assert!(validate_capability(&cap, None, &pay(1).with_required_tier(2), NOW).is_ok());
        assert_eq!(
            validate_capability(&cap, None, &pay(1).with_execution(51, 0), NOW),
            Err(RailError::SlippageExceeded)
        );
        assert_eq!(
            validate_capability(&cap, None, &pay(1).with_execution(50, 11), NOW),
            Err(RailError::FeeExceeded)
        );
    }

    #[test]
    fn test_near_limit_flags() {
        let mut cap = capability();
        cap.daily_spent = 350;
        cap.total_spent = 350;
        let outcome = validate_capability(&cap, None, &pay(50), NOW).unwrap();
        assert!(outcome.has_flag(flags::NEAR_DAILY_LIMIT));
        assert!(!outcome.has_flag(flags::NEAR_TOTAL_LIMIT));
    }

    #[test]
    fn test_issue_params_validation() {
        let config = DelegationConfig::default();
        let base = IssueCapabilityParams {
            agent: AgentId([2; 32]),
            allowed_programs: program::ALL,
            allowed_assets: asset::ALL,
            per_tx_limit: 10,
            daily_limit: 20,
            total_limit: 30,
            max_slippage_bps: 0,
            max_fee: 0,
            valid_from: NOW,
            expires_at: NOW + 10,
            cooldown_seconds: 0,
            risk_tier: 0,
            destination_allowlist: Vec::new(),
            nonce: 0,
        };
        assert!(base.validate(&config, NOW).is_ok());

        let mut p = base.clone();
        p.expires_at = NOW;
        assert_eq!(p.validate(&config, NOW), Err(RailError::InvalidExpiry));

        let mut p = base.clone();
        p.valid_from = p.expires_at;
        assert_eq!(p.validate(&config, NOW), Err(RailError::InvalidExpiry));

        let mut p = base.clone();
        p.per_tx_limit = 21;
        assert!(matches!(p.validate(&config, NOW), Err(RailError::InvalidLimits { .. })));

        let mut p = base.clone();
        p.max_slippage_bps = 10_001;
        assert!(matches!(p.validate(&config, NOW), Err(RailError::InvalidLimits { .. })));

        let mut p = base.clone();
        p.destination_allowlist = vec![Address([0; 32]); 11];
        assert_eq!(
            p.validate(&config, NOW),
            Err(RailError::TooManyDestinations { count: 11, max: 10 })
        );

        let cap = base.into_capability(Address([1; 32]), NOW);
        assert!(!cap.enforce_allowlist);
        assert_eq!(cap.current_day, day_number(NOW));
    }
}
