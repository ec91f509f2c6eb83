//! Terminal confirmation channel: renders the proposal and reads a
//! yes/no answer from stdin. EOF, a read failure, or anything that is not
//! an affirmative counts as a decline — the gated action then never runs.

use async_trait::async_trait;

use kuatia_agent::{ConfirmationChannel, ConfirmationProposal};

/// Interactive confirmation over the controlling terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalConfirmation;

/// Format an integer guaraní amount with dot thousands separators.
pub fn format_guaranies(amount: i64) -> String {
    let digits = amount.abs().to_string();
    let mut grouped = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }
    if amount < 0 {
        format!("-{grouped} Gs.")
    } else {
        format!("{grouped} Gs.")
    }
}

/// Whether a trimmed answer counts as an affirmative.
fn is_affirmative(answer: &str) -> bool {
    matches!(
        answer.trim().to_ascii_lowercase().as_str(),
        "y" | "yes" | "s" | "si" | "sí"
    )
}

fn render(proposal: &ConfirmationProposal) -> String {
    match proposal {
        ConfirmationProposal::Configuration { ruc, config } => format!(
            "About to register the issuer configuration for RUC {ruc}:\n\
             \x20 stamp number:     {}\n\
             \x20 establishment:    {}\n\
             \x20 dispatch point:   {}\n\
             \x20 document type:    {}\n\
             \x20 activity:         {} ({})\n\
             \x20 valid from:       {}\n\
             \x20 modality:         {}",
            config.stamp_number,
            config.establishment,
            config.dispatch_point,
            config.document_type,
            config.economic_activity.description,
            config.economic_activity.code,
            config.validity_start,
            config.modality(),
        ),
        ConfirmationProposal::Invoice {
            ruc,
            recipient,
            document_type,
            item_count,
            reconciled,
        } => format!(
            "About to submit a {document_type} for RUC {ruc}:\n\
             \x20 recipient:        {recipient}\n\
             \x20 line items:       {item_count}\n\
             \x20 subtotal:         {}\n\
             \x20 tax:              {}\n\
             \x20 grand total:      {}",
            format_guaranies(reconciled.subtotal),
            format_guaranies(reconciled.total_tax),
            format_guaranies(reconciled.grand_total),
        ),
    }
}

#[async_trait]
impl ConfirmationChannel for TerminalConfirmation {
    async fn request_confirmation(&self, proposal: &ConfirmationProposal) -> bool {
        println!("\n{}", render(proposal));
        println!("Proceed? [y/N]");

        // Block a worker thread on stdin; the agent future stays
        // cancellable while the operator decides.
        let answer = tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) => None, // EOF
                Ok(_) => Some(line),
                Err(_) => None,
            }
        })
        .await;

        match answer {
            Ok(Some(line)) => is_affirmative(&line),
            _ => false,
        }
    }

    fn channel_name(&self) -> &str {
        "TerminalConfirmation"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuatia_core::{DocumentType, InvoiceSummary, Ruc};

    #[test]
    fn affirmative_answers() {
        for answer in ["y", "Y", "yes", "s", "Si", " sí \n"] {
            assert!(is_affirmative(answer), "{answer:?} should confirm");
        }
    }

    #[test]
    fn everything_else_declines() {
        for answer in ["", "n", "no", "q", "maybe", "yess"] {
            assert!(!is_affirmative(answer), "{answer:?} should decline");
        }
    }

    #[test]
    fn guarani_formatting_groups_thousands() {
        assert_eq!(format_guaranies(0), "0 Gs.");
        assert_eq!(format_guaranies(500), "500 Gs.");
        assert_eq!(format_guaranies(500_000), "500.000 Gs.");
        assert_eq!(format_guaranies(12_345_678), "12.345.678 Gs.");
        assert_eq!(format_guaranies(-7_500), "-7.500 Gs.");
    }

    #[test]
    fn invoice_rendering_shows_reconciled_totals() {
        let rendered = render(&ConfirmationProposal::Invoice {
            ruc: Ruc::new("5452").expect("valid RUC"),
            recipient: "Cliente S.R.L.".into(),
            document_type: DocumentType::ElectronicInvoice,
            item_count: 2,
            reconciled: InvoiceSummary {
                subtotal: 500_000,
                total_tax: 50_000,
                grand_total: 550_000,
            },
        });
        assert!(rendered.contains("Cliente S.R.L."));
        assert!(rendered.contains("500.000 Gs."));
        assert!(rendered.contains("550.000 Gs."));
    }
}
