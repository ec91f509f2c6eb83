//! `kuatia issue` — run the configure-then-issue workflow for one
//! invoice request read from a JSON file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Args;

use kuatia_agent::InvoiceAgent;
use kuatia_core::InvoiceRequest;
use kuatia_sifen_client::HttpSifenService;

use crate::config::AgentConfig;
use crate::confirm::TerminalConfirmation;
use crate::file_store::JsonFileStore;

/// Arguments for the `issue` subcommand.
#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Path to the invoice request (JSON).
    pub invoice: PathBuf,
}

/// Issue one invoice, prompting on the terminal for every gated action.
pub async fn run_issue(
    args: &IssueArgs,
    config: &AgentConfig,
    state_dir: &Path,
) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(&args.invoice)
        .with_context(|| format!("reading invoice request {}", args.invoice.display()))?;
    let request: InvoiceRequest = serde_json::from_str(&raw)
        .with_context(|| format!("parsing invoice request {}", args.invoice.display()))?;

    let service = Arc::new(HttpSifenService::new(config.endpoint())?);
    let agent = InvoiceAgent::new(
        service,
        Arc::new(TerminalConfirmation),
        Arc::new(JsonFileStore::new(state_dir)),
    );
    let credentials = config.credentials()?;

    match agent.issue_invoice(&credentials, &request).await {
        Ok(result) => {
            println!("Invoice issued.");
            println!("  document id:  {}", result.document_id);
            println!("  control code: {}", result.control_code);
            println!("  issued at:    {}", result.issued_at);
            Ok(())
        }
        Err(err) => {
            eprintln!("{} [{}]", err, err.code());
            eprintln!("{}", err.recovery());
            Err(err.into())
        }
    }
}
