//! # Invoice Types & Arithmetic Reconciliation
//!
//! The invoice request supplied per issuance call, the summary arithmetic
//! that must reconcile before anything leaves the process, and the
//! immutable result returned by the authority.
//!
//! ## Amounts
//!
//! All amounts are integer guaraníes (`i64`). The guaraní has no minor
//! unit, so integer arithmetic is exact; floats never appear in monetary
//! positions.
//!
//! ## Reconciliation Invariant
//!
//! For every line: `line_total = quantity × unit_price + tax_amount`.
//! For the invoice: `grand_total = Σ line_total = subtotal + total_tax`.
//! A request that does not reconcile is rejected locally with zero calls
//! to the remote service.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{FIXED_DISPATCH_POINT, FIXED_ESTABLISHMENT};
use crate::error::{AgentError, InvoiceRejection};
use crate::identity::Ruc;

/// The party the invoice is issued to.
///
/// At least one of `ruc` / `identity_document` must be present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    /// Recipient RUC, when the recipient is a registered taxpayer.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ruc: Option<Ruc>,
    /// Identity document number, for unregistered recipients.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity_document: Option<String>,
    /// Recipient display name.
    pub name: String,
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Internal item code.
    pub code: String,
    /// Item description.
    pub description: String,
    /// Quantity of units. Must be positive.
    pub quantity: u32,
    /// Price per unit in guaraníes. Must be positive.
    pub unit_price: i64,
    /// Tax charged on the line in guaraníes. Must be non-negative.
    pub tax_amount: i64,
    /// Line total: `quantity × unit_price + tax_amount`.
    pub line_total: i64,
}

/// Caller-supplied invoice totals, verified against the line items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceSummary {
    /// Sum of `quantity × unit_price` over all lines.
    pub subtotal: i64,
    /// Sum of `tax_amount` over all lines.
    pub total_tax: i64,
    /// `subtotal + total_tax`.
    pub grand_total: i64,
}

/// An invoice issuance request.
///
/// Supplied per call and discarded after use; never cached.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRequest {
    /// The invoiced party.
    pub recipient: Recipient,
    /// Issue date of the document.
    pub issue_date: NaiveDate,
    /// Invoice lines. Must be non-empty.
    pub items: Vec<LineItem>,
    /// Caller-supplied totals, reconciled against `items`.
    pub summary: InvoiceSummary,
    /// Optional establishment override. When present, must be 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub establishment: Option<u16>,
    /// Optional dispatch-point override. When present, must be 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dispatch_point: Option<u16>,
}

impl InvoiceRequest {
    /// Recompute the summary from the line items.
    ///
    /// This is the summary a confirmation proposal must carry: verified
    /// numbers derived from the lines, never the caller-supplied totals.
    ///
    /// # Errors
    ///
    /// Returns [`InvoiceRejection::TotalsMismatch`] if any intermediate
    /// product or sum overflows `i64`.
    pub fn reconciled_summary(&self) -> Result<InvoiceSummary, AgentError> {
        let mut subtotal: i64 = 0;
        let mut total_tax: i64 = 0;
        let mut grand_total: i64 = 0;
        for (index, item) in self.items.iter().enumerate() {
            let base = i64::from(item.quantity)
                .checked_mul(item.unit_price)
                .ok_or_else(|| overflow(index))?;
            subtotal = subtotal.checked_add(base).ok_or_else(|| overflow(index))?;
            total_tax = total_tax
                .checked_add(item.tax_amount)
                .ok_or_else(|| overflow(index))?;
            grand_total = grand_total
                .checked_add(item.line_total)
                .ok_or_else(|| overflow(index))?;
        }
        Ok(InvoiceSummary {
            subtotal,
            total_tax,
            grand_total,
        })
    }

    /// Validate the request without touching the network.
    ///
    /// Checks, in order: recipient identity, per-line amounts and
    /// arithmetic, summary reconciliation, grand-total positivity, and the
    /// fixed establishment/dispatch-point constraints.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::InvoiceValidation`] naming the first violated
    /// rule. A request that fails here has caused zero remote calls.
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.recipient.name.trim().is_empty()
            || (self.recipient.ruc.is_none() && self.recipient.identity_document.is_none())
        {
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::InvalidRecipient,
                detail: "recipient needs a name and a RUC or identity document".into(),
            });
        }

        if self.items.is_empty() {
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::NonPositiveAmount,
                detail: "invoice has no line items".into(),
            });
        }

        for (index, item) in self.items.iter().enumerate() {
            if item.quantity == 0 || item.unit_price <= 0 || item.tax_amount < 0 {
                return Err(AgentError::InvoiceValidation {
                    reason: InvoiceRejection::NonPositiveAmount,
                    detail: format!(
                        "line {index}: quantity and unit price must be positive, tax non-negative"
                    ),
                });
            }
            let base = i64::from(item.quantity)
                .checked_mul(item.unit_price)
                .and_then(|b| b.checked_add(item.tax_amount))
                .ok_or_else(|| overflow(index))?;
            if item.line_total != base {
                return Err(AgentError::InvoiceValidation {
                    reason: InvoiceRejection::TotalsMismatch,
                    detail: format!(
                        "line {index}: line total {} != quantity × unit price + tax = {base}",
                        item.line_total
                    ),
                });
            }
        }

        let computed = self.reconciled_summary()?;
        if computed != self.summary {
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::TotalsMismatch,
                detail: format!(
                    "summary {:?} does not reconcile with line items {computed:?}",
                    self.summary
                ),
            });
        }
        let expected_grand = computed
            .subtotal
            .checked_add(computed.total_tax)
            .ok_or_else(|| overflow(0))?;
        if computed.grand_total != expected_grand {
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::TotalsMismatch,
                detail: format!(
                    "grand total {} != subtotal {} + tax {}",
                    computed.grand_total, computed.subtotal, computed.total_tax
                ),
            });
        }
        if computed.grand_total <= 0 {
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::NonPositiveAmount,
                detail: format!("grand total must be positive, got {}", computed.grand_total),
            });
        }

        if let Some(establishment) = self.establishment {
            if establishment != FIXED_ESTABLISHMENT {
                return Err(AgentError::InvoiceValidation {
                    reason: InvoiceRejection::ConstraintViolation,
                    detail: format!(
                        "establishment must be {FIXED_ESTABLISHMENT}, got {establishment}"
                    ),
                });
            }
        }
        if let Some(dispatch_point) = self.dispatch_point {
            if dispatch_point != FIXED_DISPATCH_POINT {
                return Err(AgentError::InvoiceValidation {
                    reason: InvoiceRejection::ConstraintViolation,
                    detail: format!(
                        "dispatch point must be {FIXED_DISPATCH_POINT}, got {dispatch_point}"
                    ),
                });
            }
        }

        Ok(())
    }
}

fn overflow(index: usize) -> AgentError {
    AgentError::InvoiceValidation {
        reason: InvoiceRejection::TotalsMismatch,
        detail: format!("line {index}: amount arithmetic overflows"),
    }
}

/// The legally binding artifact returned by a successful submission.
///
/// Immutable once obtained. It cannot be deleted, only corrected via a new
/// compensating document; this stack never mutates or re-derives it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceResult {
    /// Authority-assigned document identifier.
    pub document_id: String,
    /// Unique control code (CDC) identifying the issued document.
    pub control_code: String,
    /// When the authority recorded the issuance.
    pub issued_at: DateTime<Utc>,
}
