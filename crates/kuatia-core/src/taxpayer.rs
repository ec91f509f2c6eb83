//! # Taxpayer Types — Credentials, Session, Profile
//!
//! Types describing the taxpayer on whose behalf the agent operates.
//!
//! ## Lifecycle
//!
//! - [`Credentials`] are supplied by the caller for each workflow invocation
//!   and discarded after use. They are never serialized and never persisted;
//!   the secret key is zeroized on drop.
//! - [`Session`] is created at login and lives until explicit invalidation
//!   or process end. It is never persisted across restarts.
//! - [`Profile`] is taxpayer metadata returned by login, read-only after
//!   retrieval.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::identity::{Ruc, SecurityCode, StampNumber};

/// Emission mode tag sent with every authentication request.
///
/// The agent only issues under normal emission; contingency emission is the
/// authority's fallback channel for service outages and is accepted here
/// solely so payloads can name it explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EmissionMode {
    /// Normal online emission (SIFEN code 1).
    #[default]
    Normal,
    /// Contingency emission (SIFEN code 2).
    Contingency,
}

impl EmissionMode {
    /// The numeric SIFEN code for this mode.
    pub fn code(&self) -> u8 {
        match self {
            Self::Normal => 1,
            Self::Contingency => 2,
        }
    }
}

impl std::fmt::Display for EmissionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Contingency => write!(f, "contingency"),
        }
    }
}

/// The taxpayer's secret authentication key.
///
/// Held in memory only for the duration of the calls that need it and
/// zeroized on drop. `Debug` renders a placeholder so the key cannot leak
/// through logs or panic messages.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey(String);

impl SecretKey {
    /// Wrap a secret key value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw key. Only request-building code should call this.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretKey(<redacted>)")
    }
}

/// Authentication material for one taxpayer.
///
/// Immutable, supplied by the caller per invocation, never persisted by the
/// core. The taxpayer identifier rides here because it is the subject of
/// authentication; there is no separate taxpayer parameter to disagree with.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Taxpayer registration number, without check digit.
    pub ruc: Ruc,
    /// Secret authentication key.
    pub secret_key: SecretKey,
    /// Fixed emission-mode tag.
    pub emission_mode: EmissionMode,
}

impl Credentials {
    /// Create credentials with the default (normal) emission mode.
    pub fn new(ruc: Ruc, secret_key: SecretKey) -> Self {
        Self {
            ruc,
            secret_key,
            emission_mode: EmissionMode::default(),
        }
    }
}

/// Opaque session token issued by the remote service at login.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

impl SessionToken {
    /// Wrap a raw token value.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw token for request headers.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// An authenticated session with the remote service.
///
/// Owned exclusively by the session manager. Lifetime: until explicit
/// invalidation or process end. Never persisted.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque token presented on every authenticated call.
    pub token: SessionToken,
    /// When the session was established.
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a session stamped with the current time.
    pub fn new(token: SessionToken) -> Self {
        Self {
            token,
            created_at: Utc::now(),
        }
    }
}

/// Registration status of the taxpayer as reported by the authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxpayerStatus {
    /// Registration current; the taxpayer may issue documents.
    Active,
    /// Registration inactive; issuance is blocked.
    Inactive,
    /// Registration suspended by the authority.
    Suspended,
}

impl std::fmt::Display for TaxpayerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "Active"),
            Self::Inactive => write!(f, "Inactive"),
            Self::Suspended => write!(f, "Suspended"),
        }
    }
}

/// Taxpayer classification used in issuer configurations and documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaxpayerType {
    /// Natural person (SIFEN code 1).
    PhysicalPerson,
    /// Legal entity (SIFEN code 2).
    LegalEntity,
}

impl TaxpayerType {
    /// The numeric SIFEN code for this classification.
    pub fn code(&self) -> u8 {
        match self {
            Self::PhysicalPerson => 1,
            Self::LegalEntity => 2,
        }
    }
}

impl std::fmt::Display for TaxpayerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PhysicalPerson => write!(f, "PhysicalPerson"),
            Self::LegalEntity => write!(f, "LegalEntity"),
        }
    }
}

/// Declared economic activity of the taxpayer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EconomicActivity {
    /// Activity code as registered with the authority.
    pub code: String,
    /// Human-readable activity description.
    pub description: String,
}

/// Taxpayer metadata retrieved once per session at login.
///
/// Read-only after retrieval. The stamp fields carry the authoritative
/// issuance authorization the issuer-configuration proposal is derived
/// from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// Registered business name.
    pub business_name: String,
    /// Current registration status.
    pub status: TaxpayerStatus,
    /// Declared economic activity.
    pub economic_activity: EconomicActivity,
    /// Taxpayer classification.
    pub taxpayer_type: TaxpayerType,
    /// Date the electronic-invoicing enrollment was approved.
    pub approval_date: NaiveDate,
    /// Active issuance authorization number.
    pub stamp_number: StampNumber,
    /// Date the stamp became valid.
    pub stamp_valid_from: NaiveDate,
    /// Taxpayer security code used to derive document control codes.
    pub security_code: SecurityCode,
}
