//! # Issuer Configuration & Cache Entries
//!
//! The one-time setup record describing how a taxpayer issues electronic
//! documents, plus the cache-entry envelope and invalidation trigger
//! vocabulary used by the persistent configuration cache.
//!
//! ## Fixed Constraints
//!
//! This stack only supports establishment 1 and dispatch point 1. A
//! configuration carrying any other value fails validation loudly; it is
//! never silently corrected.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, ConfigFailureReason};
use crate::identity::{SecurityCode, StampNumber};
use crate::taxpayer::{EconomicActivity, TaxpayerType};

/// The only establishment number this stack issues under.
pub const FIXED_ESTABLISHMENT: u16 = 1;

/// The only dispatch point this stack issues under.
pub const FIXED_DISPATCH_POINT: u16 = 1;

/// Electronic document classes, with their SIFEN type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DocumentType {
    /// Factura electrónica (type 1). The primary document class.
    ElectronicInvoice,
    /// Autofactura electrónica (type 4).
    SelfBilledInvoice,
    /// Nota de crédito electrónica (type 5).
    CreditNote,
    /// Nota de débito electrónica (type 6).
    DebitNote,
    /// Nota de remisión electrónica (type 7).
    RemissionNote,
}

impl DocumentType {
    /// The numeric SIFEN document type code.
    pub fn code(&self) -> u8 {
        match self {
            Self::ElectronicInvoice => 1,
            Self::SelfBilledInvoice => 4,
            Self::CreditNote => 5,
            Self::DebitNote => 6,
            Self::RemissionNote => 7,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ElectronicInvoice => write!(f, "ElectronicInvoice"),
            Self::SelfBilledInvoice => write!(f, "SelfBilledInvoice"),
            Self::CreditNote => write!(f, "CreditNote"),
            Self::DebitNote => write!(f, "DebitNote"),
            Self::RemissionNote => write!(f, "RemissionNote"),
        }
    }
}

/// Configuration complexity tier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Modality {
    /// Basic feature set; no advanced group flags.
    #[default]
    Basic,
    /// Advanced feature set; at least one group flag enabled.
    Advanced,
}

impl std::fmt::Display for Modality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic => write!(f, "Basic"),
            Self::Advanced => write!(f, "Advanced"),
        }
    }
}

/// Group flags of the advanced modality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdvancedOptions {
    /// Operations denominated in foreign currency.
    pub foreign_currency: bool,
    /// Free-of-charge line items.
    pub free_of_charge_items: bool,
    /// Goods dispatched by a third party.
    pub third_party_dispatch: bool,
}

impl AdvancedOptions {
    /// Whether any group flag is enabled.
    pub fn any_enabled(&self) -> bool {
        self.foreign_currency || self.free_of_charge_items || self.third_party_dispatch
    }
}

/// The one-time issuer setup record for a taxpayer.
///
/// Created once per taxpayer, refreshed on cache miss or mismatch,
/// invalidated by the triggers in [`InvalidationTrigger`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IssuerConfiguration {
    /// Active issuance authorization number.
    pub stamp_number: StampNumber,
    /// Establishment number. Must be [`FIXED_ESTABLISHMENT`].
    pub establishment: u16,
    /// Dispatch point. Must be [`FIXED_DISPATCH_POINT`].
    pub dispatch_point: u16,
    /// Document class issued under this configuration.
    pub document_type: DocumentType,
    /// Declared economic activity.
    pub economic_activity: EconomicActivity,
    /// Date the configuration becomes valid.
    pub validity_start: NaiveDate,
    /// Taxpayer classification.
    pub taxpayer_type: TaxpayerType,
    /// Taxpayer security code.
    pub security_code: SecurityCode,
    /// Optional logo, base64-encoded. Presentation only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// Optional advanced-modality group flags.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub advanced: Option<AdvancedOptions>,
}

impl IssuerConfiguration {
    /// Check the fixed constraints.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigFailureReason::ConstraintViolation`] error if the
    /// establishment or dispatch point differs from 1. The value is never
    /// corrected in place.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.establishment != FIXED_ESTABLISHMENT {
            return Err(AgentError::Configuration {
                reason: ConfigFailureReason::ConstraintViolation,
                detail: format!(
                    "establishment must be {FIXED_ESTABLISHMENT}, got {}",
                    self.establishment
                ),
            });
        }
        if self.dispatch_point != FIXED_DISPATCH_POINT {
            return Err(AgentError::Configuration {
                reason: ConfigFailureReason::ConstraintViolation,
                detail: format!(
                    "dispatch point must be {FIXED_DISPATCH_POINT}, got {}",
                    self.dispatch_point
                ),
            });
        }
        Ok(())
    }

    /// The modality implied by the advanced group flags.
    pub fn modality(&self) -> Modality {
        match &self.advanced {
            Some(options) if options.any_enabled() => Modality::Advanced,
            _ => Modality::Basic,
        }
    }

    /// Structural equality against the authoritative copy, ignoring the
    /// logo. The logo is presentation-only and the remote source does not
    /// round-trip it byte for byte, so it must not trigger reconciliation
    /// churn.
    pub fn reconciles_with(&self, authoritative: &Self) -> bool {
        self.stamp_number == authoritative.stamp_number
            && self.establishment == authoritative.establishment
            && self.dispatch_point == authoritative.dispatch_point
            && self.document_type == authoritative.document_type
            && self.economic_activity == authoritative.economic_activity
            && self.validity_start == authoritative.validity_start
            && self.taxpayer_type == authoritative.taxpayer_type
            && self.security_code == authoritative.security_code
            && self.advanced == authoritative.advanced
    }
}

/// The five events that evict a cached issuer configuration.
///
/// Recorded for audit when an eviction happens; the trigger does not alter
/// behavior beyond the eviction itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InvalidationTrigger {
    /// The taxpayer's registration status changed.
    StatusChange,
    /// Establishment data was updated with the authority.
    EstablishmentUpdate,
    /// The security code was rotated.
    SecurityCodeUpdate,
    /// The stamp expired.
    StampExpiration,
    /// The authority notified a configuration change.
    ConfigurationChangeNotice,
}

impl InvalidationTrigger {
    /// All trigger kinds, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::StatusChange,
        Self::EstablishmentUpdate,
        Self::SecurityCodeUpdate,
        Self::StampExpiration,
        Self::ConfigurationChangeNotice,
    ];
}

impl std::fmt::Display for InvalidationTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StatusChange => write!(f, "status-change"),
            Self::EstablishmentUpdate => write!(f, "establishment-update"),
            Self::SecurityCodeUpdate => write!(f, "security-code-update"),
            Self::StampExpiration => write!(f, "stamp-expiration"),
            Self::ConfigurationChangeNotice => write!(f, "configuration-change-notice"),
        }
    }
}

/// Envelope wrapping a cached value with its freshness bookkeeping.
///
/// An entry is logically absent once `now > stored_at + ttl`, regardless of
/// whether it has been physically deleted from the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    /// The cached value.
    pub value: T,
    /// When the entry was written.
    pub stored_at: DateTime<Utc>,
    /// Time-to-live in seconds from `stored_at`.
    pub ttl_secs: i64,
    /// Trigger tags that could evict this entry. Audit data.
    pub sensitive_to: Vec<InvalidationTrigger>,
}

impl<T> CacheEntry<T> {
    /// Wrap a value stamped now, sensitive to every trigger kind.
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            stored_at: Utc::now(),
            ttl_secs: ttl.num_seconds(),
            sensitive_to: InvalidationTrigger::ALL.to_vec(),
        }
    }

    /// The instant after which the entry is logically absent.
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.stored_at + Duration::seconds(self.ttl_secs)
    }

    /// Whether the entry is logically absent at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at()
    }
}
