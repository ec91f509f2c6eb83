//! `kuatia show-config` — print the locally cached issuer configuration
//! and its freshness. Reads the persistent level only; it performs no
//! remote reconciliation and is safe to run offline.

use std::path::Path;

use anyhow::Context;
use chrono::Utc;

use kuatia_agent::ConfigStore;

use crate::config::AgentConfig;
use crate::file_store::JsonFileStore;

/// Print the cached configuration entry, if any.
pub fn run_show(config: &AgentConfig, state_dir: &Path) -> anyhow::Result<()> {
    let store = JsonFileStore::new(state_dir);
    match store.load(&config.ruc)? {
        None => {
            println!("No cached issuer configuration for RUC {}.", config.ruc);
        }
        Some(entry) => {
            let status = if entry.is_expired(Utc::now()) {
                "EXPIRED"
            } else {
                "fresh"
            };
            println!(
                "Cached issuer configuration for RUC {} ({status}):",
                config.ruc
            );
            println!("  stored at:  {}", entry.stored_at);
            println!("  expires at: {}", entry.expires_at());
            let rendered = serde_json::to_string_pretty(&entry.value)
                .context("rendering cached configuration")?;
            println!("{rendered}");
        }
    }
    Ok(())
}
