//! # kuatia-core — Domain Model & Error Taxonomy
//!
//! Foundation crate of the Kuatia Stack, a human-supervised issuing agent
//! for SIFEN, Paraguay's national electronic-invoicing service.
//!
//! ## Contents
//!
//! - **Identity** (`identity.rs`): validated newtypes for the RUC, stamp
//!   number, and security code. Malformed identifiers are rejected at
//!   construction and at deserialization.
//!
//! - **Taxpayer** (`taxpayer.rs`): credentials (zeroized secret), session
//!   token, and the login profile.
//!
//! - **Configuration** (`config.rs`): the one-time issuer setup record
//!   with its fixed establishment/dispatch-point constraints, cache-entry
//!   envelope, and invalidation trigger vocabulary.
//!
//! - **Invoice** (`invoice.rs`): request, line items, summary arithmetic
//!   reconciliation, and the immutable issuance result.
//!
//! - **Errors** (`error.rs`): the closed [`AgentError`] taxonomy with
//!   machine codes, retryability, and static recovery hints.
//!
//! ## Design
//!
//! Types here carry no I/O. Everything that talks to the network lives in
//! `kuatia-sifen-client`; everything that orchestrates lives in
//! `kuatia-agent`.

pub mod config;
pub mod error;
pub mod identity;
pub mod invoice;
pub mod taxpayer;

// ─── Identity re-exports ────────────────────────────────────────────

pub use identity::{Ruc, SecurityCode, StampNumber};

// ─── Taxpayer re-exports ────────────────────────────────────────────

pub use taxpayer::{
    Credentials, EconomicActivity, EmissionMode, Profile, SecretKey, Session, SessionToken,
    TaxpayerStatus, TaxpayerType,
};

// ─── Configuration re-exports ───────────────────────────────────────

pub use config::{
    AdvancedOptions, CacheEntry, DocumentType, InvalidationTrigger, IssuerConfiguration,
    Modality, FIXED_DISPATCH_POINT, FIXED_ESTABLISHMENT,
};

// ─── Invoice re-exports ─────────────────────────────────────────────

pub use invoice::{InvoiceRequest, InvoiceResult, InvoiceSummary, LineItem, Recipient};

// ─── Error re-exports ───────────────────────────────────────────────

pub use error::{
    AgentError, AuthFailureReason, ConfigFailureReason, InvoiceRejection, ProposalKind,
    TransportKind, ValidationError,
};
