//! Issuer registry
//!
//! Issuers are the trust anchors allowed to sign attestations. Only the
//! registry admin may add, suspend or reactivate them.

use humanrail_core::config::{TrustConfig, MAX_HUMAN_SCORE};
use humanrail_core::{Address, IssuerId, KeyedArena, RailError, RailResult};
use serde::{Deserialize, Serialize};

/// Kind of identity claim an issuer makes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IssuerKind {
    /// KYC provider
    #[default]
    KycProvider,
    /// Proof-of-personhood protocol
    ProofOfPersonhood,
    /// Social account verification
    SocialVerification,
    /// Device-based attestation
    DeviceBased,
    /// Physical event attendance
    EventBased,
    /// Anything else
    Custom,
}

/// Administrative status of an issuer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum IssuerStatus {
    /// May sign new attestations
    #[default]
    Active,
    /// Temporarily barred from signing
    Suspended,
}

/// A registered issuer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuer {
    /// Derived from `authority`
    pub id: IssuerId,
    /// Key that signs attestations
    pub authority: Address,
    /// Display name
    pub name: String,
    /// Claim kind
    pub kind: IssuerKind,
    /// Administrative status
    pub status: IssuerStatus,
    /// Largest weight any single attestation may carry
    pub max_weight: u16,
    /// Whether weights from this issuer count toward uniqueness
    pub contributes_to_uniqueness: bool,
    /// Validity applied when an attestation omits `expires_at`
    pub default_validity: i64,
    /// Optional metadata location
    pub metadata_uri: Option<String>,
    /// Attestations registered
    pub attestations_issued: u64,
    /// Attestations revoked
    pub attestations_revoked: u64,
    /// Registration time
    pub registered_at: i64,
    /// Admin that registered it
    pub registered_by: Address,
}

impl Issuer {
    /// True while the issuer may sign
    pub fn is_active(&self) -> bool {
        self.status == IssuerStatus::Active
    }
}

/// Input to [`IssuerRegistry::register_issuer`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterIssuerParams {
    /// Signing authority
    pub authority: Address,
    /// Display name
    pub name: String,
    /// Claim kind
    pub kind: IssuerKind,
    /// Per-attestation weight cap, `1..=10000`
    pub max_weight: u16,
    /// Counts toward uniqueness
    pub contributes_to_uniqueness: bool,
    /// Falls back to configured default when `None`
    pub default_validity: Option<i64>,
    /// Optional metadata location
    pub metadata_uri: Option<String>,
}

/// Admin-controlled set of issuers
#[derive(Debug)]
pub struct IssuerRegistry {
    admin: Address,
    config: TrustConfig,
    issuers: KeyedArena<IssuerId, Issuer>,
}

impl IssuerRegistry {
    /// Empty registry administered by `admin`
    pub fn new(admin: Address, config: TrustConfig) -> Self {
        Self {
            admin,
            config,
            issuers: KeyedArena::new(),
        }
    }

    /// Registry admin
    pub fn admin(&self) -> Address {
        self.admin
    }

    fn require_admin(&self, caller: &Address) -> RailResult<()> {
        if *caller != self.admin {
            tracing::warn!(caller = %caller, "non-admin issuer registry call");
            return Err(RailError::unauthorized("caller is not the registry admin"));
        }
        Ok(())
    }

    /// Add a new issuer.
    pub fn register_issuer(
        &self,
        caller: &Address,
        params: RegisterIssuerParams,
        now: i64,
    ) -> RailResult<IssuerId> {
        self.require_admin(caller)?;
        if params.max_weight == 0 || params.max_weight > MAX_HUMAN_SCORE {
            return Err(RailError::InvalidWeight {
                weight: params.max_weight,
            });
        }
        let default_validity = params
            .default_validity
            .unwrap_or(self.config.default_attestation_validity_secs);
        if default_validity <= 0 {
            return Err(RailError::InvalidValidityWindow);
        }

        let id = IssuerId::derive(&params.authority);
        let issuer = Issuer {
            id,
            authority: params.authority,
            name: params.name,
            kind: params.kind,
            status: IssuerStatus::Active,
            max_weight: params.max_weight,
            contributes_to_uniqueness: params.contributes_to_uniqueness,
            default_validity,
            metadata_uri: params.metadata_uri,
            attestations_issued: 0,
            attestations_revoked: 0,
            registered_at: now,
            registered_by: *caller,
        };
        let (kind, max_weight) = (issuer.kind, issuer.max_weight);
        self.issuers
            .insert_new(id, issuer)
            .map_err(|_| RailError::IssuerAlreadyExists)?;

        tracing::info!(issuer = %id, ?kind, max_weight, "issuer registered");
        Ok(id)
    }

    fn set_status(&self, caller: &Address, id: &IssuerId, status: IssuerStatus) -> RailResult<()> {
        self.require_admin(caller)?;
        self.issuers
            .with_mut(id, |issuer| issuer.status = status)
            .ok_or(RailError::IssuerNotFound)?;
        tracing::info!(issuer = %id, ?status, "issuer status changed");
        Ok(())
    }

    /// Bar an issuer from signing new attestations. Existing ones keep counting.
    pub fn suspend_issuer(&self, caller: &Address, id: &IssuerId) -> RailResult<()> {
        self.set_status(caller, id, IssuerStatus::Suspended)
    }

    /// Lift a suspension.
    pub fn reactivate_issuer(&self, caller: &Address, id: &IssuerId) -> RailResult<()> {
        self.set_status(caller, id, IssuerStatus::Active)
    }

    /// Snapshot of an issuer
    pub fn get(&self, id: &IssuerId) -> RailResult<Issuer> {
        self.issuers.get(id).ok_or(RailError::IssuerNotFound)
    }

    /// Snapshot of the issuer controlled by `authority`
    pub fn by_authority(&self, authority: &Address) -> RailResult<Issuer> {
        self.get(&IssuerId::derive(authority))
    }

    pub(crate) fn record_issued(&self, id: &IssuerId) {
        self.issuers.with_mut(id, |issuer| {
            issuer.attestations_issued = issuer.attestations_issued.saturating_add(1);
        });
    }

    pub(crate) fn record_revoked(&self, id: &IssuerId) {
        self.issuers.with_mut(id, |issuer| {
            issuer.attestations_revoked = issuer.attestations_revoked.saturating_add(1);
        });
    }

    /// Number of registered issuers
    pub fn len(&self) -> usize {
        self.issuers.len()
    }

    /// True if no issuers are registered
    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }
}
