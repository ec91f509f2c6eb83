//! # kuatia-agent — Orchestration Core
//!
//! The configure-then-issue workflow engine of the Kuatia Stack. Composes
//! four capabilities into a human-supervised issuing agent:
//!
//! - a remote invoicing service (`kuatia_sifen_client::SifenService`)
//! - a confirmation channel ([`ConfirmationChannel`]) — mandatory
//!   approval before any state-changing action
//! - a durable configuration store ([`ConfigStore`]) behind the
//!   reconciling [`ConfigurationCache`]
//! - a document-type selection policy ([`DocumentTypePolicy`])
//!
//! The exposed surface is [`InvoiceAgent::issue_invoice`] and
//! [`InvoiceAgent::invalidate_configuration`]; everything else exists in
//! service of those two entry points.

pub mod cache;
pub mod confirm;
pub mod orchestrator;
pub mod policy;
pub mod session;
pub mod store;

pub use cache::{ConfigurationCache, CONFIG_TTL_DAYS};
pub use confirm::{AutoApprove, AutoDeny, ConfirmationChannel, ConfirmationProposal};
pub use orchestrator::InvoiceAgent;
pub use policy::{DocumentTypePolicy, PrimaryDocumentPolicy};
pub use session::{SessionManager, SessionState};
pub use store::{ConfigStore, MemoryConfigStore};
