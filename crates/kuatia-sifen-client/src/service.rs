//! # SIFEN Service Interface
//!
//! Defines the [`SifenService`] trait that abstracts over the national
//! electronic-invoicing backend. Production deployments implement it
//! against the live SIFEN API ([`crate::http::HttpSifenService`]); test
//! environments use [`crate::mock::MockSifenService`]. This separation
//! lets the issuing agent compose remote operations without coupling to a
//! specific transport or API version.
//!
//! ## Contract
//!
//! Implementations must be `Send + Sync` so they can be shared across
//! async tasks behind an `Arc`. The trait is object-safe to support
//! runtime adapter selection (mock vs. live). Every method fails with a
//! classified [`AgentError`]; no transport-level error type leaks through
//! this boundary.
//!
//! ## Ordering
//!
//! The service is fallible and unordered beyond normal request/response
//! pairing. Callers own retry policy ([`crate::retry`]) and sequencing.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use kuatia_core::{
    AgentError, Credentials, EmissionMode, InvoiceRequest, InvoiceResult, IssuerConfiguration,
    Profile, Ruc, Session, SessionToken, StampNumber,
};

/// Successful login: the session plus the taxpayer profile, retrieved
/// together in a single round trip.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// The established session.
    pub session: Session,
    /// Taxpayer metadata, read-only for the session's lifetime.
    pub profile: Profile,
}

/// Receipt returned when an issuer configuration is persisted remotely.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigReceipt {
    /// Authority-assigned configuration identifier.
    pub config_id: String,
}

/// The payload submitted for invoice issuance: the validated request plus
/// the issuer-configuration fields the document is issued under, and a
/// client-generated idempotency key so a retried submission cannot issue
/// twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceSubmission {
    /// Issuing taxpayer.
    pub ruc: Ruc,
    /// Stamp the document issues under.
    pub stamp_number: StampNumber,
    /// Establishment number (always 1).
    pub establishment: u16,
    /// Dispatch point (always 1).
    pub dispatch_point: u16,
    /// SIFEN document type code.
    pub document_type_code: u8,
    /// SIFEN emission mode code.
    pub emission_mode_code: u8,
    /// Idempotency key for the submission.
    pub idempotency_key: String,
    /// The validated invoice request.
    pub request: InvoiceRequest,
}

impl InvoiceSubmission {
    /// Assemble a submission from a validated request and the active
    /// issuer configuration, generating a fresh idempotency key.
    pub fn assemble(
        ruc: Ruc,
        config: &IssuerConfiguration,
        emission_mode: EmissionMode,
        request: InvoiceRequest,
    ) -> Self {
        Self {
            ruc,
            stamp_number: config.stamp_number.clone(),
            establishment: config.establishment,
            dispatch_point: config.dispatch_point,
            document_type_code: config.document_type.code(),
            emission_mode_code: emission_mode.code(),
            idempotency_key: Uuid::new_v4().to_string(),
            request,
        }
    }
}

/// Capability trait for the remote SIFEN backend.
///
/// The four operations the issuing agent needs, each failing with a
/// classified error per the taxonomy in `kuatia_core::error`.
#[async_trait]
pub trait SifenService: Send + Sync {
    /// Authenticate the taxpayer, establishing a session and returning
    /// the profile in the same round trip.
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AgentError>;

    /// Fetch the authoritative issuer configuration. `None` means the
    /// taxpayer has never completed issuer setup.
    async fn fetch_current_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
    ) -> Result<Option<IssuerConfiguration>, AgentError>;

    /// Persist a new or changed issuer configuration.
    async fn save_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
        config: &IssuerConfiguration,
    ) -> Result<ConfigReceipt, AgentError>;

    /// Submit an invoice for issuance. On success the returned
    /// [`InvoiceResult`] is final; callers must not mutate or re-derive
    /// its control code.
    async fn submit_invoice(
        &self,
        token: &SessionToken,
        submission: &InvoiceSubmission,
    ) -> Result<InvoiceResult, AgentError>;

    /// Human-readable name of this implementation (e.g.
    /// "MockSifenService", "HttpSifenService").
    fn service_name(&self) -> &str;
}
