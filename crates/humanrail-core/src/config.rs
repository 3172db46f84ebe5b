//! Engine configuration
//!
//! [`RailConfig`] is loaded from TOML, optionally overlaid with `HUMANRAIL_*`
//! environment variables, then validated. Missing keys fall back to defaults.
//!
//! ```toml
//! [trust]
//! verified_score_threshold = 5000
//! uniqueness_threshold = 100
//!
//! [receipts]
//! max_batch_size = 10
//! ```

use crate::errors::{RailError, RailResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Maximum possible human score.
pub const MAX_HUMAN_SCORE: u16 = 10_000;
/// Score at which a profile counts as "human enough" for tasks and payments.
pub const HUMAN_SCORE_THRESHOLD: u16 = 5_000;
/// Uniqueness-contributing weight that must be exceeded to be a proven unique individual.
pub const UNIQUENESS_THRESHOLD: u16 = 100;
/// Score a principal needs to register agents.
pub const MIN_HUMAN_SCORE_FOR_AGENT: u16 = 50;
/// Active attestations a profile may hold at once.
pub const MAX_ATTESTATIONS_PER_PROFILE: usize = 8;
/// Attestation validity used when neither caller nor issuer supplies one.
pub const DEFAULT_ATTESTATION_VALIDITY_SECS: i64 = 90 * 86_400;
/// Hard ceiling on capability destination allowlists.
pub const MAX_DESTINATION_ALLOWLIST: usize = 10;
/// Highest risk tier a capability may carry.
pub const MAX_RISK_TIER: u8 = 4;
/// Basis points in 100%.
pub const MAX_BPS: u16 = 10_000;
/// Previous agent key stays valid this long after rotation.
pub const KEY_ROTATION_GRACE_SECS: i64 = 86_400;
/// Receipts per batch.
pub const MAX_BATCH_SIZE: usize = 10;
/// Bytes in an off-chain receipt reference.
pub const MAX_OFFCHAIN_REF_LEN: usize = 64;

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "HUMANRAIL_";

/// Trust scoring parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Score required by `verify_human` callers that ask for "verified"
    pub verified_score_threshold: u16,
    /// Uniqueness weight that must be exceeded
    pub uniqueness_threshold: u16,
    /// Score a principal needs to register an agent
    pub min_agent_score: u16,
    /// Active attestation cap per profile
    pub max_attestations_per_profile: usize,
    /// Fallback attestation validity in seconds
    pub default_attestation_validity_secs: i64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            verified_score_threshold: HUMAN_SCORE_THRESHOLD,
            uniqueness_threshold: UNIQUENESS_THRESHOLD,
            min_agent_score: MIN_HUMAN_SCORE_FOR_AGENT,
            max_attestations_per_profile: MAX_ATTESTATIONS_PER_PROFILE,
            default_attestation_validity_secs: DEFAULT_ATTESTATION_VALIDITY_SECS,
        }
    }
}

/// Capability issuance bounds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelegationConfig {
    /// Allowlist length cap, never above [`MAX_DESTINATION_ALLOWLIST`]
    pub max_destination_allowlist: usize,
    /// Highest accepted risk tier
    pub max_risk_tier: u8,
}

impl Default for DelegationConfig {
    fn default() -> Self {
        Self {
            max_destination_allowlist: MAX_DESTINATION_ALLOWLIST,
            max_risk_tier: MAX_RISK_TIER,
        }
    }
}

/// Agent registry parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Grace window for the previous signing key after rotation
    pub key_rotation_grace_secs: i64,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            key_rotation_grace_secs: KEY_ROTATION_GRACE_SECS,
        }
    }
}

/// Receipt ledger parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiptConfig {
    /// Largest accepted batch
    pub max_batch_size: usize,
    /// Longest accepted off-chain reference
    pub max_offchain_ref_len: usize,
}

impl Default for ReceiptConfig {
    fn default() -> Self {
        Self {
            max_batch_size: MAX_BATCH_SIZE,
            max_offchain_ref_len: MAX_OFFCHAIN_REF_LEN,
        }
    }
}

/// Complete engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RailConfig {
    /// `[trust]`
    pub trust: TrustConfig,
    /// `[delegation]`
    pub delegation: DelegationConfig,
    /// `[agents]`
    pub agents: AgentConfig,
    /// `[receipts]`
    pub receipts: ReceiptConfig,
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> RailResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| RailError::config(format!("invalid value {value:?} for {key}")))
}

impl RailConfig {
    /// Parse from a TOML document.
    pub fn from_toml_str(input: &str) -> RailResult<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Load from a TOML file.
    pub fn load_from_file(path: &Path) -> RailResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            RailError::config(format!("failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "loaded rail config");
        Ok(config)
    }

    /// Overlay `HUMANRAIL_<SECTION>_<KEY>` variables from the process environment.
    pub fn merge_with_env(&mut self) -> RailResult<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Overlay variables from an explicit iterator. Unprefixed names are ignored.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> RailResult<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (name, value) in vars {
            let Some(rest) = name.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let lowered = rest.to_ascii_lowercase();
            let Some((section, field)) = lowered.split_once('_') else {
                return Err(RailError::config(format!(
                    "environment key {} has no section",
                    name.as_ref()
                )));
            };
            self.set_from_string(&format!("{section}.{field}"), value.as_ref())?;
        }
        Ok(())
    }

    /// Set a single value by dotted key, e.g. `trust.uniqueness_threshold`.
    pub fn set_from_string(&mut self, key: &str, value: &str) -> RailResult<()> {
        match key {
            "trust.verified_score_threshold" => {
                self.trust.verified_score_threshold = parse_value(key, value)?;
            }
            "trust.uniqueness_threshold" => {
                self.trust.uniqueness_threshold = parse_value(key, value)?;
            }
            "trust.min_agent_score" => self.trust.min_agent_score = parse_value(key, value)?,
            "trust.max_attestations_per_profile" => {
                self.trust.max_attestations_per_profile = parse_value(key, value)?;
            }
            "trust.default_attestation_validity_secs" => {
                self.trust.default_attestation_validity_secs = parse_value(key, value)?;
            }
            "delegation.max_destination_allowlist" => {
                self.delegation.max_destination_allowlist = parse_value(key, value)?;
            }
            "delegation.max_risk_tier" => {
                self.delegation.max_risk_tier = parse_value(key, value)?;
            }
            "agents.key_rotation_grace_secs" => {
                self.agents.key_rotation_grace_secs = parse_value(key, value)?;
            }
            "receipts.max_batch_size" => self.receipts.max_batch_size = parse_value(key, value)?,
            "receipts.max_offchain_ref_len" => {
                self.receipts.max_offchain_ref_len = parse_value(key, value)?;
            }
            other => return Err(RailError::config(format!("unknown config key {other}"))),
        }
        Ok(())
    }

    /// Check cross-field bounds.
    pub fn validate(&self) -> RailResult<()> {
        let t = &self.trust;
        if t.verified_score_threshold > MAX_HUMAN_SCORE {
            return Err(RailError::config("trust.verified_score_threshold above 10000"));
        }
        if t.uniqueness_threshold > MAX_HUMAN_SCORE {
            return Err(RailError::config("trust.uniqueness_threshold above 10000"));
        }
        if t.min_agent_score > MAX_HUMAN_SCORE {
            return Err(RailError::config("trust.min_agent_score above 10000"));
        }
        if t.max_attestations_per_profile == 0 {
            return Err(RailError::config("trust.max_attestations_per_profile must be positive"));
        }
        if t.default_attestation_validity_secs <= 0 {
            return Err(RailError::config(
                "trust.default_attestation_validity_secs must be positive",
            ));
        }
        if self.delegation.max_destination_allowlist > MAX_DESTINATION_ALLOWLIST {
            return Err(RailError::config(format!(
                "delegation.max_destination_allowlist above {MAX_DESTINATION_ALLOWLIST}"
            )));
        }
        if self.agents.key_rotation_grace_secs < 0 {
            return Err(RailError::config("agents.key_rotation_grace_secs is negative"));
        }
        if self.receipts.max_batch_size == 0 {
            return Err(RailError::config("receipts.max_batch_size must be positive"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = RailConfig::default();
        assert!(config.validate().is_ok());
        assert_ne!(
            config.trust.verified_score_threshold,
            config.trust.uniqueness_threshold
        );
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = RailConfig::from_toml_str(
            r#"
            [trust]
            uniqueness_threshold = 250

            [receipts]
            max_batch_size = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.trust.uniqueness_threshold, 250);
        assert_eq!(config.trust.min_agent_score, MIN_HUMAN_SCORE_FOR_AGENT);
        assert_eq!(config.receipts.max_batch_size, 4);
        assert_eq!(config.delegation, DelegationConfig::default());
    }

    #[test]
    fn test_bad_toml_is_config_error() {
        let err =
            RailConfig::from_toml_str("[trust]\nuniqueness_threshold = \"many\"").unwrap_err();
        assert!(matches!(err, RailError::Config { .. }));
    }

    #[test]
    fn test_env_overlay() {
        let mut config = RailConfig::default();
        config
            .merge_with_vars([
                ("HUMANRAIL_TRUST_UNIQUENESS_THRESHOLD", "300"),
                ("HUMANRAIL_AGENTS_KEY_ROTATION_GRACE_SECS", "60"),
                ("PATH", "/usr/bin"),
            ])
            .unwrap();
        assert_eq!(config.trust.uniqueness_threshold, 300);
        assert_eq!(config.agents.key_rotation_grace_secs, 60);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let mut config = RailConfig::default();
        assert!(config.set_from_string("trust.nope", "1").is_err());
        assert!(config.set_from_string("trust.min_agent_score", "-1").is_err());
    }

    #[test]
    fn test_allowlist_ceiling_enforced() {
        let mut config = RailConfig::default();
        config.delegation.max_destination_allowlist = 11;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("humanrail.toml");
        std::fs::write(&path, "[delegation]\nmax_risk_tier = 2\n").unwrap();
        let config = RailConfig::load_from_file(&path).unwrap();
        assert_eq!(config.delegation.max_risk_tier, 2);
    }
}
