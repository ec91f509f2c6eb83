//! # Error Taxonomy — Classified Failures
//!
//! Every failure raised anywhere in the Kuatia Stack is one of the closed
//! set of [`AgentError`] kinds. Lower layers (HTTP transport, persistence
//! media, the remote service itself) must map their failures into this
//! taxonomy at the boundary; no unclassified error type crosses a crate
//! boundary.
//!
//! ## Design
//!
//! - Sub-reasons are fieldless enums, so callers classify by matching on
//!   tags — never by string inspection.
//! - `code()`, `is_retryable()`, and `recovery()` are derived, static,
//!   per-variant data. They are tested by enumeration, not by branching
//!   logic of their own.
//! - Only transport failures are retryable. Authentication, configuration,
//!   validation, and cancellation are terminal for the call that raised
//!   them and must reach the caller unchanged.

use thiserror::Error;

/// Error constructing a validated identifier newtype.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// RUC is not 1 to 8 ASCII digits.
    #[error("invalid RUC (expected 1-8 digits without check digit): {0:?}")]
    InvalidRuc(String),

    /// Stamp number is not exactly 8 ASCII digits.
    #[error("invalid stamp number (expected 8 digits): {0:?}")]
    InvalidStampNumber(String),

    /// Security code is empty, too long, or non-numeric. The offending
    /// value is deliberately not echoed.
    #[error("invalid security code")]
    InvalidSecurityCode,
}

/// Why an authentication attempt was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthFailureReason {
    /// The RUC/secret-key pair was rejected.
    InvalidCredentials,
    /// The taxpayer's electronic-invoicing enrollment is still pending
    /// approval by the authority.
    EnrollmentNotApproved,
    /// The RUC exists but is not in active status.
    RucInactive,
}

impl std::fmt::Display for AuthFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials => write!(f, "invalid credentials"),
            Self::EnrollmentNotApproved => write!(f, "enrollment not approved"),
            Self::RucInactive => write!(f, "RUC inactive"),
        }
    }
}

/// Why an issuer configuration was rejected by the authority or failed
/// local constraint validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConfigFailureReason {
    /// A fixed constraint was violated (establishment or dispatch point
    /// different from 1, stamp/validity inconsistency).
    ConstraintViolation,
    /// The taxpayer has no usable digital certificate registered.
    MissingCertificate,
    /// The security code was rejected by the authority.
    InvalidSecurityCode,
}

impl std::fmt::Display for ConfigFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConstraintViolation => write!(f, "constraint violation"),
            Self::MissingCertificate => write!(f, "missing certificate"),
            Self::InvalidSecurityCode => write!(f, "invalid security code"),
        }
    }
}

/// Why an invoice request was rejected before or during submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InvoiceRejection {
    /// Recipient identity is missing or malformed.
    InvalidRecipient,
    /// A quantity, unit price, or total is zero or negative where a
    /// positive value is required.
    NonPositiveAmount,
    /// The authority already holds a document with this number.
    DuplicateDocument,
    /// The stamp under which the invoice would issue has expired.
    StampExpired,
    /// Line-item arithmetic does not reconcile with the summary.
    TotalsMismatch,
    /// Establishment or dispatch point present in the request but not 1.
    ConstraintViolation,
}

impl std::fmt::Display for InvoiceRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidRecipient => write!(f, "invalid recipient"),
            Self::NonPositiveAmount => write!(f, "non-positive amount"),
            Self::DuplicateDocument => write!(f, "duplicate document"),
            Self::StampExpired => write!(f, "stamp expired"),
            Self::TotalsMismatch => write!(f, "totals mismatch"),
            Self::ConstraintViolation => write!(f, "constraint violation"),
        }
    }
}

/// Transient transport failure kinds. These are the only retryable
/// failures in the taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    /// The request timed out before a response arrived.
    Timeout,
    /// The service reported itself temporarily unavailable (5xx).
    TemporarilyUnavailable,
    /// The service is shedding load (HTTP 429).
    RateLimited,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeout => write!(f, "timeout"),
            Self::TemporarilyUnavailable => write!(f, "temporarily unavailable"),
            Self::RateLimited => write!(f, "rate limited"),
        }
    }
}

/// The state-changing action a confirmation proposal gates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProposalKind {
    /// Persisting a new or changed issuer configuration.
    Configuration,
    /// Submitting an invoice for issuance.
    Invoice,
}

impl std::fmt::Display for ProposalKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Invoice => write!(f, "invoice"),
        }
    }
}

/// The closed set of classified failures raised by the Kuatia Stack.
///
/// Each variant carries a machine [`code()`](AgentError::code), a derived
/// [`is_retryable()`](AgentError::is_retryable) flag, and a static
/// [`recovery()`](AgentError::recovery) hint suitable for direct display.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Authentication against the remote service failed.
    #[error("authentication failed ({reason}): {detail}")]
    Authentication {
        /// The specific rejection reason.
        reason: AuthFailureReason,
        /// Diagnostic context from the rejecting layer.
        detail: String,
    },

    /// The issuer configuration was rejected.
    #[error("issuer configuration rejected ({reason}): {detail}")]
    Configuration {
        /// The specific rejection reason.
        reason: ConfigFailureReason,
        /// Diagnostic context from the rejecting layer.
        detail: String,
    },

    /// The current issuer configuration could not be retrieved, either from
    /// the persistent store or from the authoritative remote source.
    #[error("configuration retrieval failed: {detail}")]
    ConfigurationRetrieval {
        /// Diagnostic context from the failing layer.
        detail: String,
    },

    /// The invoice request was rejected before or during submission.
    #[error("invoice validation failed ({reason}): {detail}")]
    InvoiceValidation {
        /// The specific rejection reason.
        reason: InvoiceRejection,
        /// Diagnostic context from the rejecting layer.
        detail: String,
    },

    /// A transient transport failure. The only retryable kind.
    #[error("transport failure ({kind}): {detail}")]
    Transport {
        /// The transient failure sub-kind.
        kind: TransportKind,
        /// Diagnostic context including the endpoint involved.
        detail: String,
    },

    /// The human operator declined (or failed to affirm) a gated action.
    #[error("operation cancelled by the operator before {action} was performed")]
    UserCancelled {
        /// The gated action that was declined.
        action: ProposalKind,
    },
}

impl AgentError {
    /// Stable machine code identifying the kind and sub-reason.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Authentication { reason, .. } => match reason {
                AuthFailureReason::InvalidCredentials => "AUTH_INVALID_CREDENTIALS",
                AuthFailureReason::EnrollmentNotApproved => "ENROLLMENT_NOT_APPROVED",
                AuthFailureReason::RucInactive => "RUC_INACTIVE",
            },
            Self::Configuration { reason, .. } => match reason {
                ConfigFailureReason::ConstraintViolation => "CONFIG_CONSTRAINT_VIOLATION",
                ConfigFailureReason::MissingCertificate => "CONFIG_MISSING_CERTIFICATE",
                ConfigFailureReason::InvalidSecurityCode => "CONFIG_INVALID_SECURITY_CODE",
            },
            Self::ConfigurationRetrieval { .. } => "CONFIG_RETRIEVAL_FAILED",
            Self::InvoiceValidation { reason, .. } => match reason {
                InvoiceRejection::InvalidRecipient => "INVOICE_INVALID_RECIPIENT",
                InvoiceRejection::NonPositiveAmount => "INVOICE_NON_POSITIVE_AMOUNT",
                InvoiceRejection::DuplicateDocument => "INVOICE_DUPLICATE_DOCUMENT",
                InvoiceRejection::StampExpired => "INVOICE_STAMP_EXPIRED",
                InvoiceRejection::TotalsMismatch => "INVOICE_TOTALS_MISMATCH",
                InvoiceRejection::ConstraintViolation => "INVOICE_CONSTRAINT_VIOLATION",
            },
            Self::Transport { kind, .. } => match kind {
                TransportKind::Timeout => "TRANSPORT_TIMEOUT",
                TransportKind::TemporarilyUnavailable => "TRANSPORT_UNAVAILABLE",
                TransportKind::RateLimited => "TRANSPORT_RATE_LIMITED",
            },
            Self::UserCancelled { .. } => "USER_CANCELLED",
        }
    }

    /// Whether the failure may be retried automatically.
    ///
    /// True only for the transport sub-kinds. Every other kind is terminal
    /// and must propagate to the caller without automatic retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Transport {
                kind: TransportKind::Timeout
                    | TransportKind::TemporarilyUnavailable
                    | TransportKind::RateLimited,
                ..
            }
        )
    }

    /// Static, kind-specific recovery hint intended for direct display to
    /// the operator.
    pub fn recovery(&self) -> &'static str {
        match self {
            Self::Authentication { reason, .. } => match reason {
                AuthFailureReason::InvalidCredentials => {
                    "Verify the RUC (without check digit) and the secret key, then retry."
                }
                AuthFailureReason::EnrollmentNotApproved => {
                    "Wait for the authority to approve the electronic-invoicing enrollment."
                }
                AuthFailureReason::RucInactive => {
                    "Regularize the taxpayer's status with the authority before issuing."
                }
            },
            Self::Configuration { .. } => {
                "Review the issuer configuration with the authority; it was rejected and must be corrected manually."
            }
            Self::ConfigurationRetrieval { .. } => {
                "The configuration source was unreachable. Retry the operation once connectivity is restored."
            }
            Self::InvoiceValidation { .. } => {
                "Correct the invoice request; nothing was submitted."
            }
            Self::Transport { .. } => {
                "Temporary service problem. Retry the operation; it was not applied."
            }
            Self::UserCancelled { .. } => {
                "No action was performed. Re-run the operation to be prompted again."
            }
        }
    }
}
