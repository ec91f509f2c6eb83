//! # Configuration Cache — Reconciled Reads, Audited Eviction
//!
//! Answers "what is the current issuer configuration for taxpayer X" with
//! at most one extra round trip, while never returning stale data
//! undetected.
//!
//! ## Freshness Over Performance
//!
//! The cache is an optimization over the authoritative remote source, not
//! a replacement for it. A cached entry is never returned blindly:
//! [`ConfigurationCache::current`] always fetches the authoritative copy
//! and reconciles. When the copies disagree the authoritative one wins,
//! the mismatch is logged, and the cache is refreshed. When the remote
//! source is unreachable while a cached copy exists, the read fails; a
//! potentially-stale copy is never served as verified.

use std::sync::Arc;

use chrono::{Duration, Utc};

use kuatia_core::{
    AgentError, CacheEntry, InvalidationTrigger, IssuerConfiguration, Ruc, SessionToken,
};
use kuatia_sifen_client::SifenService;

use crate::store::ConfigStore;

/// Time-to-live of a persisted configuration entry, in days.
pub const CONFIG_TTL_DAYS: i64 = 90;

/// Two-level configuration cache over a durable [`ConfigStore`].
///
/// The session-scoped level lives with the per-taxpayer runtime in the
/// orchestrator; this type owns the persistent level and its
/// reconciliation discipline.
pub struct ConfigurationCache {
    store: Arc<dyn ConfigStore>,
    ttl: Duration,
}

impl ConfigurationCache {
    /// Create a cache with the standard 90-day TTL.
    pub fn new(store: Arc<dyn ConfigStore>) -> Self {
        Self {
            store,
            ttl: Duration::days(CONFIG_TTL_DAYS),
        }
    }

    /// Create a cache with a custom TTL.
    pub fn with_ttl(store: Arc<dyn ConfigStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// The reconciling read.
    ///
    /// - Cached and unexpired: fetch the authoritative copy and reconcile.
    ///   Equal → return the cached value. Different → log a mismatch
    ///   event, refresh the cache with the authoritative copy, return it.
    ///   Authoritative side has nothing → evict and return `None`.
    /// - Nothing cached (or expired): fetch from source; store and return
    ///   what it holds.
    ///
    /// # Errors
    ///
    /// Transient transport failures during either fetch are surfaced as
    /// [`AgentError::ConfigurationRetrieval`]; a rejected session token
    /// propagates as the authentication failure it is. A cached copy is
    /// never served when reconciliation could not run.
    pub async fn current(
        &self,
        ruc: &Ruc,
        service: &dyn SifenService,
        token: &SessionToken,
    ) -> Result<Option<IssuerConfiguration>, AgentError> {
        let cached = self
            .store
            .load(ruc)?
            .filter(|entry| !entry.is_expired(Utc::now()));

        let authoritative = service
            .fetch_current_configuration(ruc, token)
            .await
            .map_err(|err| {
                if err.is_retryable() {
                    AgentError::ConfigurationRetrieval {
                        detail: format!("authoritative configuration fetch failed: {err}"),
                    }
                } else {
                    err
                }
            })?;

        match (cached, authoritative) {
            (Some(entry), Some(remote)) => {
                if entry.value.reconciles_with(&remote) {
                    Ok(Some(entry.value))
                } else {
                    tracing::warn!(
                        ruc = %ruc,
                        "cached issuer configuration diverged from authoritative copy; refreshing"
                    );
                    self.set(ruc, remote.clone())?;
                    Ok(Some(remote))
                }
            }
            (Some(_), None) => {
                tracing::warn!(
                    ruc = %ruc,
                    "authoritative source holds no configuration; evicting cached copy"
                );
                self.store.delete(ruc)?;
                Ok(None)
            }
            (None, Some(remote)) => {
                self.set(ruc, remote.clone())?;
                Ok(Some(remote))
            }
            (None, None) => Ok(None),
        }
    }

    /// Write-through: store the configuration stamped now, overwriting
    /// any prior entry.
    pub fn set(&self, ruc: &Ruc, config: IssuerConfiguration) -> Result<(), AgentError> {
        let entry = CacheEntry::new(config, self.ttl);
        self.store.save(ruc, &entry)
    }

    /// Evict immediately regardless of TTL, recording the trigger for
    /// audit. Idempotent: invalidating an absent entry is a no-op.
    pub fn invalidate(&self, ruc: &Ruc, trigger: InvalidationTrigger) -> Result<(), AgentError> {
        let existed = self.store.delete(ruc)?;
        tracing::info!(
            ruc = %ruc,
            trigger = %trigger,
            existed,
            "issuer configuration invalidated"
        );
        Ok(())
    }

    /// Untriggered eviction used when a configuration is presumed wrong
    /// (the authority rejected it).
    pub(crate) fn evict(&self, ruc: &Ruc) -> Result<(), AgentError> {
        let existed = self.store.delete(ruc)?;
        if existed {
            tracing::warn!(ruc = %ruc, "evicted rejected issuer configuration");
        }
        Ok(())
    }
}
