//! # Document-Type Selection Policy
//!
//! When the agent derives an issuer-configuration proposal it must choose
//! the document class to configure. The selection heuristic is a pluggable
//! policy, not hard-coded logic: deployments with issuance history can
//! rank by frequency, while the shipped default falls back to the primary
//! electronic-invoice type.

use kuatia_core::{DocumentType, Profile};

/// Pluggable selection of the document class for a configuration
/// proposal.
pub trait DocumentTypePolicy: Send + Sync {
    /// Choose the document class to propose for this taxpayer.
    fn select(&self, profile: &Profile) -> DocumentType;

    /// Human-readable name of this policy implementation.
    fn policy_name(&self) -> &str;
}

/// Default policy: always the primary electronic-invoice type (SIFEN
/// type 1). Used when issuance history is absent or ambiguous.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrimaryDocumentPolicy;

impl DocumentTypePolicy for PrimaryDocumentPolicy {
    fn select(&self, _profile: &Profile) -> DocumentType {
        DocumentType::ElectronicInvoice
    }

    fn policy_name(&self) -> &str {
        "PrimaryDocumentPolicy"
    }
}
