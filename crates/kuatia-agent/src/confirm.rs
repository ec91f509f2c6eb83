//! # Confirmation Channel — Human-in-the-Loop Gating
//!
//! The capability the orchestrator depends on for mandatory approval of
//! state-changing actions. There is no override path: every configuration
//! persist and every invoice submission is preceded by a proposal, and a
//! negative or missing response aborts the operation with no side effects
//! performed.
//!
//! The concrete channel (terminal prompt, UI dialog, approval queue) is an
//! external collaborator. It may take arbitrarily long to answer; the
//! core imposes no timeout, and cancelling the wait aborts the gated
//! action.

use async_trait::async_trait;

use kuatia_core::{
    DocumentType, InvoiceSummary, IssuerConfiguration, ProposalKind, Ruc,
};

/// What the operator is being asked to approve.
///
/// The invoice variant carries the summary recomputed from the line
/// items — verified numbers, never caller-supplied totals.
#[derive(Debug, Clone)]
pub enum ConfirmationProposal {
    /// Persist a new or changed issuer configuration.
    Configuration {
        /// Taxpayer the configuration belongs to.
        ruc: Ruc,
        /// The proposed configuration.
        config: IssuerConfiguration,
    },
    /// Submit an invoice for issuance.
    Invoice {
        /// Issuing taxpayer.
        ruc: Ruc,
        /// Recipient display name.
        recipient: String,
        /// Document class being issued.
        document_type: DocumentType,
        /// Number of invoice lines.
        item_count: usize,
        /// Totals reconciled from the line items.
        reconciled: InvoiceSummary,
    },
}

impl ConfirmationProposal {
    /// The gated action this proposal covers.
    pub fn kind(&self) -> ProposalKind {
        match self {
            Self::Configuration { .. } => ProposalKind::Configuration,
            Self::Invoice { .. } => ProposalKind::Invoice,
        }
    }
}

/// Capability trait for the human-approval step.
///
/// Implementations must be `Send + Sync` and object-safe. A channel that
/// cannot obtain an answer (closed stdin, disconnected UI) reports
/// `false`; the orchestrator treats declined and unanswerable alike.
#[async_trait]
pub trait ConfirmationChannel: Send + Sync {
    /// Present the proposal and resolve to the operator's decision.
    async fn request_confirmation(&self, proposal: &ConfirmationProposal) -> bool;

    /// Human-readable name of this channel implementation.
    fn channel_name(&self) -> &str;
}

/// Channel that approves every proposal. For tests and unattended
/// embedders that gate elsewhere.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoApprove;

#[async_trait]
impl ConfirmationChannel for AutoApprove {
    async fn request_confirmation(&self, _proposal: &ConfirmationProposal) -> bool {
        true
    }

    fn channel_name(&self) -> &str {
        "AutoApprove"
    }
}

/// Channel that declines every proposal. For tests of the denial path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AutoDeny;

#[async_trait]
impl ConfirmationChannel for AutoDeny {
    async fn request_confirmation(&self, _proposal: &ConfirmationProposal) -> bool {
        false
    }

    fn channel_name(&self) -> &str {
        "AutoDeny"
    }
}
