//! # Invoice Agent — The Configure-Then-Issue Orchestrator
//!
//! Composes the session manager, configuration cache, confirmation
//! channel, and retry policy into the two workflows the stack exposes:
//! configure-if-needed and issue-invoice.
//!
//! ## Workflow
//!
//! Every `issue_invoice` call runs:
//!
//! 1. Local validation — a malformed request is rejected with zero remote
//!    calls.
//! 2. Per-taxpayer critical section — at most one configure-or-fetch
//!    sequence is in flight per RUC; distinct RUCs never contend.
//! 3. Session establishment — an existing live session is reused,
//!    otherwise the call authenticates.
//! 4. Configure-if-needed — the reconciling cache read runs on *every*
//!    call, because the authoritative source may have changed. On a miss
//!    the agent derives a proposal from the login profile, gates it
//!    through the confirmation channel, persists it remotely, and writes
//!    through to the cache.
//! 5. Invoice gate — the operator confirms the reconciled totals.
//! 6. Submission under retry — transient transport failures back off
//!    exponentially; everything else propagates unchanged.
//!
//! ## Failure Side Effects
//!
//! The orchestrator never swallows or reclassifies an error; it only adds
//! side effects before rethrowing: an authentication failure invalidates
//! the session (the next call re-authenticates), a configuration
//! rejection evicts the cached configuration (it is presumed wrong).
//!
//! ## Cancellation
//!
//! The confirmation wait and the backoff sleeps are ordinary suspension
//! points. Dropping the future at either aborts the call before the gated
//! action runs and before anything is cached.

use std::sync::Arc;

use chrono::Duration;
use dashmap::DashMap;
use tokio::sync::Mutex;

use kuatia_core::{
    AgentError, AuthFailureReason, Credentials, InvalidationTrigger, InvoiceRequest,
    InvoiceResult, IssuerConfiguration, Modality, Profile, ProposalKind, Ruc,
    FIXED_DISPATCH_POINT, FIXED_ESTABLISHMENT,
};
use kuatia_sifen_client::{with_retry, InvoiceSubmission, RetryPolicy, SifenService};

use crate::cache::ConfigurationCache;
use crate::confirm::{ConfirmationChannel, ConfirmationProposal};
use crate::policy::{DocumentTypePolicy, PrimaryDocumentPolicy};
use crate::session::{SessionManager, SessionState};
use crate::store::ConfigStore;

/// Session-scoped state for one taxpayer: the session manager and the
/// resolved modality. Cleared when the session ends; never durable.
struct TaxpayerRuntime {
    session: SessionManager,
    modality: Option<Modality>,
}

impl TaxpayerRuntime {
    fn new() -> Self {
        Self {
            session: SessionManager::new(),
            modality: None,
        }
    }
}

/// The issuing agent.
///
/// One instance serves any number of taxpayers concurrently; all state is
/// keyed by RUC and calls for distinct RUCs never block each other.
pub struct InvoiceAgent {
    service: Arc<dyn SifenService>,
    confirmations: Arc<dyn ConfirmationChannel>,
    cache: ConfigurationCache,
    policy: Arc<dyn DocumentTypePolicy>,
    retry: RetryPolicy,
    runtimes: DashMap<String, Arc<Mutex<TaxpayerRuntime>>>,
}

impl InvoiceAgent {
    /// Create an agent with the default document policy, retry policy,
    /// and 90-day cache TTL.
    pub fn new(
        service: Arc<dyn SifenService>,
        confirmations: Arc<dyn ConfirmationChannel>,
        store: Arc<dyn ConfigStore>,
    ) -> Self {
        Self {
            service,
            confirmations,
            cache: ConfigurationCache::new(store),
            policy: Arc::new(PrimaryDocumentPolicy),
            retry: RetryPolicy::default(),
            runtimes: DashMap::new(),
        }
    }

    /// Replace the document-type selection policy.
    pub fn with_document_policy(mut self, policy: Arc<dyn DocumentTypePolicy>) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the submission retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replace the configuration cache TTL.
    pub fn with_cache_ttl(mut self, store: Arc<dyn ConfigStore>, ttl: Duration) -> Self {
        self.cache = ConfigurationCache::with_ttl(store, ttl);
        self
    }

    /// Issue an invoice for the taxpayer named in the credentials.
    ///
    /// Runs the full configure-then-issue workflow described in the
    /// module docs. On success the returned [`InvoiceResult`] is exactly
    /// what the remote service issued; the control code is never
    /// re-derived.
    ///
    /// # Errors
    ///
    /// A classified [`AgentError`]. Transient kinds
    /// (`ConfigurationRetrieval`, non-exhausted `Transport`) may be
    /// retried by the caller at the workflow level; everything else is
    /// terminal for this request.
    pub async fn issue_invoice(
        &self,
        credentials: &Credentials,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResult, AgentError> {
        // Local validation first: a request that cannot reconcile makes
        // zero remote calls.
        request.validate()?;

        let runtime = self.runtime(&credentials.ruc);
        let mut rt = runtime.lock().await;

        let result = self.issue_locked(&mut rt, credentials, request).await;
        if let Err(err) = &result {
            self.apply_failure_side_effects(&mut rt, &credentials.ruc, err);
        }
        result
    }

    /// Evict the cached configuration for a taxpayer, recording the
    /// trigger for audit. Idempotent.
    pub fn invalidate_configuration(
        &self,
        ruc: &Ruc,
        trigger: InvalidationTrigger,
    ) -> Result<(), AgentError> {
        self.cache.invalidate(ruc, trigger)
    }

    /// Current session lifecycle state for a taxpayer.
    pub async fn session_state(&self, ruc: &Ruc) -> SessionState {
        // Clone out of the map before awaiting; a shard guard must not be
        // held across a suspension point.
        let runtime = self
            .runtimes
            .get(ruc.as_str())
            .map(|r| Arc::clone(r.value()));
        match runtime {
            Some(runtime) => runtime.lock().await.session.state(),
            None => SessionState::Unauthenticated,
        }
    }

    /// The modality resolved during configuration, for the session's
    /// lifetime. `None` before configuration or after the session ends.
    pub async fn resolved_modality(&self, ruc: &Ruc) -> Option<Modality> {
        let runtime = self
            .runtimes
            .get(ruc.as_str())
            .map(|r| Arc::clone(r.value()));
        match runtime {
            Some(runtime) => runtime.lock().await.modality,
            None => None,
        }
    }

    fn runtime(&self, ruc: &Ruc) -> Arc<Mutex<TaxpayerRuntime>> {
        Arc::clone(
            self.runtimes
                .entry(ruc.as_str().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(TaxpayerRuntime::new())))
                .value(),
        )
    }

    async fn issue_locked(
        &self,
        rt: &mut TaxpayerRuntime,
        credentials: &Credentials,
        request: &InvoiceRequest,
    ) -> Result<InvoiceResult, AgentError> {
        self.ensure_session(rt, credentials).await?;
        let config = self.ensure_configuration(rt, credentials).await?;

        // Gate the invoice on totals recomputed from the lines, not the
        // caller-supplied summary.
        let reconciled = request.reconciled_summary()?;
        let proposal = ConfirmationProposal::Invoice {
            ruc: credentials.ruc.clone(),
            recipient: request.recipient.name.clone(),
            document_type: config.document_type,
            item_count: request.items.len(),
            reconciled,
        };
        if !self.confirmations.request_confirmation(&proposal).await {
            return Err(AgentError::UserCancelled {
                action: ProposalKind::Invoice,
            });
        }

        let token = rt.session.token().cloned().ok_or_else(Self::session_lost)?;
        let submission = InvoiceSubmission::assemble(
            credentials.ruc.clone(),
            &config,
            credentials.emission_mode,
            request.clone(),
        );

        let service = Arc::clone(&self.service);
        let result = with_retry(self.retry, "submit_invoice", || {
            let service = Arc::clone(&service);
            let token = token.clone();
            let submission = submission.clone();
            async move { service.submit_invoice(&token, &submission).await }
        })
        .await?;

        tracing::info!(
            ruc = %credentials.ruc,
            document_id = %result.document_id,
            control_code = %result.control_code,
            "invoice issued"
        );
        Ok(result)
    }

    async fn ensure_session(
        &self,
        rt: &mut TaxpayerRuntime,
        credentials: &Credentials,
    ) -> Result<(), AgentError> {
        if rt.session.is_authenticated() {
            return Ok(());
        }
        rt.session
            .authenticate(self.service.as_ref(), credentials)
            .await
    }

    /// Configure-if-needed. Runs the reconciling cache read on every
    /// call; on a miss, derives a proposal, gates it, persists it, and
    /// writes through.
    async fn ensure_configuration(
        &self,
        rt: &mut TaxpayerRuntime,
        credentials: &Credentials,
    ) -> Result<IssuerConfiguration, AgentError> {
        let ruc = &credentials.ruc;
        let token = rt.session.token().cloned().ok_or_else(Self::session_lost)?;

        if let Some(config) = self
            .cache
            .current(ruc, self.service.as_ref(), &token)
            .await?
        {
            rt.modality = Some(config.modality());
            return Ok(config);
        }

        let profile = rt.session.profile().cloned().ok_or_else(Self::session_lost)?;
        let proposed = self.build_proposal(&profile);
        proposed.validate()?;

        let gate = ConfirmationProposal::Configuration {
            ruc: ruc.clone(),
            config: proposed.clone(),
        };
        if !self.confirmations.request_confirmation(&gate).await {
            // Declined: nothing persisted, nothing cached.
            return Err(AgentError::UserCancelled {
                action: ProposalKind::Configuration,
            });
        }

        let receipt = self
            .service
            .save_configuration(ruc, &token, &proposed)
            .await?;
        self.cache.set(ruc, proposed.clone())?;
        rt.modality = Some(proposed.modality());
        tracing::info!(
            ruc = %ruc,
            config_id = %receipt.config_id,
            document_type = %proposed.document_type,
            "issuer configuration persisted"
        );
        Ok(proposed)
    }

    /// Derive the configuration proposal from the login profile.
    fn build_proposal(&self, profile: &Profile) -> IssuerConfiguration {
        IssuerConfiguration {
            stamp_number: profile.stamp_number.clone(),
            establishment: FIXED_ESTABLISHMENT,
            dispatch_point: FIXED_DISPATCH_POINT,
            document_type: self.policy.select(profile),
            economic_activity: profile.economic_activity.clone(),
            validity_start: profile.stamp_valid_from,
            taxpayer_type: profile.taxpayer_type,
            security_code: profile.security_code.clone(),
            logo: None,
            advanced: None,
        }
    }

    /// Side effects applied before a classified error is rethrown. The
    /// error itself is never changed here.
    fn apply_failure_side_effects(
        &self,
        rt: &mut TaxpayerRuntime,
        ruc: &Ruc,
        err: &AgentError,
    ) {
        match err {
            AgentError::Authentication { .. } => {
                rt.session.invalidate();
                rt.modality = None;
            }
            AgentError::Configuration { .. } => {
                if let Err(evict_err) = self.cache.evict(ruc) {
                    tracing::warn!(
                        ruc = %ruc,
                        "failed to evict rejected configuration: {evict_err}"
                    );
                }
            }
            _ => {}
        }
    }

    /// Internal invariant breach: an operation that requires a session
    /// observed none. Reported as an authentication failure so the next
    /// call re-authenticates.
    fn session_lost() -> AgentError {
        AgentError::Authentication {
            reason: AuthFailureReason::InvalidCredentials,
            detail: "session not established for an operation that requires one".into(),
        }
    }
}
