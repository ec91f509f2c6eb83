//! `kuatia invalidate` — evict the cached issuer configuration,
//! recording the trigger for audit.

use std::path::Path;
use std::sync::Arc;

use clap::{Args, ValueEnum};

use kuatia_agent::ConfigurationCache;
use kuatia_core::InvalidationTrigger;

use crate::config::AgentConfig;
use crate::file_store::JsonFileStore;

/// Command-line spelling of the invalidation triggers.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum TriggerArg {
    /// The taxpayer's registration status changed.
    StatusChange,
    /// Establishment data was updated with the authority.
    EstablishmentUpdate,
    /// The security code was rotated.
    SecurityCodeUpdate,
    /// The stamp expired.
    StampExpiration,
    /// The authority notified a configuration change.
    ConfigurationChangeNotice,
}

impl From<TriggerArg> for InvalidationTrigger {
    fn from(arg: TriggerArg) -> Self {
        match arg {
            TriggerArg::StatusChange => Self::StatusChange,
            TriggerArg::EstablishmentUpdate => Self::EstablishmentUpdate,
            TriggerArg::SecurityCodeUpdate => Self::SecurityCodeUpdate,
            TriggerArg::StampExpiration => Self::StampExpiration,
            TriggerArg::ConfigurationChangeNotice => Self::ConfigurationChangeNotice,
        }
    }
}

/// Arguments for the `invalidate` subcommand.
#[derive(Args, Debug)]
pub struct InvalidateArgs {
    /// Why the cached configuration is being evicted.
    #[arg(long, value_enum)]
    pub trigger: TriggerArg,
}

/// Evict the cached configuration. Idempotent: evicting an absent entry
/// succeeds quietly.
pub fn run_invalidate(
    args: &InvalidateArgs,
    config: &AgentConfig,
    state_dir: &Path,
) -> anyhow::Result<()> {
    let cache = ConfigurationCache::new(Arc::new(JsonFileStore::new(state_dir)));
    let trigger: InvalidationTrigger = args.trigger.into();
    cache.invalidate(&config.ruc, trigger)?;
    println!(
        "Configuration cache for RUC {} invalidated ({trigger}).",
        config.ruc
    );
    Ok(())
}
