//! # Workflow Tests for the Issuing Agent
//!
//! Exercises the full configure-then-issue orchestration against the
//! deterministic mock service: session reuse, reconciling cache reads,
//! confirmation gating on both proposal kinds, retry exhaustion, and the
//! classified failure side effects.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;

use kuatia_agent::{
    ConfigStore, ConfirmationChannel, ConfirmationProposal, InvoiceAgent, MemoryConfigStore,
    SessionState,
};
use kuatia_core::{
    Credentials, DocumentType, InvalidationTrigger, InvoiceRequest, ProposalKind, Ruc, SecretKey,
    TransportKind,
};
use kuatia_sifen_client::{MockSifenService, RetryPolicy, SifenService};

/// Confirmation channel that records every proposal kind it sees and
/// declines exactly the configured kind (approving everything else).
struct RecordingChannel {
    seen: Mutex<Vec<ProposalKind>>,
    deny: Option<ProposalKind>,
}

impl RecordingChannel {
    fn approve_all() -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            deny: None,
        })
    }

    fn deny(kind: ProposalKind) -> Arc<Self> {
        Arc::new(Self {
            seen: Mutex::new(Vec::new()),
            deny: Some(kind),
        })
    }

    fn seen(&self) -> Vec<ProposalKind> {
        self.seen.lock().expect("seen lock").clone()
    }
}

#[async_trait]
impl ConfirmationChannel for RecordingChannel {
    async fn request_confirmation(&self, proposal: &ConfirmationProposal) -> bool {
        let kind = proposal.kind();
        self.seen.lock().expect("seen lock").push(kind);
        Some(kind) != self.deny
    }

    fn channel_name(&self) -> &str {
        "RecordingChannel"
    }
}

fn credentials(ruc: &str) -> Credentials {
    Credentials::new(
        Ruc::new(ruc).expect("valid RUC"),
        SecretKey::new("workflow-secret"),
    )
}

fn request() -> InvoiceRequest {
    serde_json::from_value(serde_json::json!({
        "recipient": { "ruc": "80012345", "name": "Cliente S.R.L." },
        "issue_date": "2024-11-05",
        "items": [{
            "code": "SRV-001",
            "description": "Professional services",
            "quantity": 1,
            "unit_price": 500000,
            "tax_amount": 0,
            "line_total": 500000
        }],
        "summary": { "subtotal": 500000, "total_tax": 0, "grand_total": 500000 }
    }))
    .expect("valid request json")
}

fn agent(
    service: &Arc<MockSifenService>,
    channel: &Arc<RecordingChannel>,
) -> (InvoiceAgent, Arc<MemoryConfigStore>) {
    let store = Arc::new(MemoryConfigStore::new());
    let agent = InvoiceAgent::new(
        service.clone() as Arc<dyn SifenService>,
        channel.clone(),
        store.clone(),
    )
    .with_retry_policy(RetryPolicy {
        max_attempts: 3,
        base_delay: StdDuration::from_millis(2),
    });
    (agent, store)
}

// ── happy path ───────────────────────────────────────────────────────────

#[tokio::test]
async fn happy_path_configures_then_issues() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, store) = agent(&service, &channel);
    let creds = credentials("5452");

    let result = agent
        .issue_invoice(&creds, &request())
        .await
        .expect("workflow should succeed");

    assert!(!result.document_id.is_empty());
    assert!(!result.control_code.is_empty());
    assert_eq!(service.login_calls(), 1);
    assert_eq!(service.fetch_calls(), 1);
    assert_eq!(service.save_calls(), 1);
    assert_eq!(service.submit_calls(), 1);
    assert_eq!(
        channel.seen(),
        vec![ProposalKind::Configuration, ProposalKind::Invoice]
    );
    assert_eq!(agent.session_state(&creds.ruc).await, SessionState::Authenticated);
    assert_eq!(
        agent.resolved_modality(&creds.ruc).await,
        Some(kuatia_core::Modality::Basic)
    );
    assert!(store.load(&creds.ruc).expect("load").is_some(), "cached");
}

#[tokio::test]
async fn second_call_reuses_session_and_configuration() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let creds = credentials("5452");

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("first call");
    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("second call");

    // At most one authenticate, exactly one save, but a reconciliation
    // fetch on every call: the cache is an optimization, not the
    // authority.
    assert_eq!(service.login_calls(), 1);
    assert_eq!(service.fetch_calls(), 2);
    assert_eq!(service.save_calls(), 1);
    assert_eq!(service.submit_calls(), 2);
    assert_eq!(
        channel.seen(),
        vec![
            ProposalKind::Configuration,
            ProposalKind::Invoice,
            ProposalKind::Invoice
        ]
    );
}

#[tokio::test]
async fn preconfigured_taxpayer_skips_save() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let creds = credentials("5452");

    // Issuer setup completed in an earlier session.
    service.seed_configuration(
        &creds.ruc,
        serde_json::from_value(serde_json::json!({
            "stamp_number": "12558946",
            "establishment": 1,
            "dispatch_point": 1,
            "document_type": "ElectronicInvoice",
            "economic_activity": { "code": "47190", "description": "Retail trade" },
            "validity_start": "2023-03-01",
            "taxpayer_type": "LegalEntity",
            "security_code": "123456789"
        }))
        .expect("valid config json"),
    );

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("workflow should succeed");

    assert_eq!(service.save_calls(), 0, "no reconfiguration needed");
    assert_eq!(service.fetch_calls(), 1);
    assert_eq!(channel.seen(), vec![ProposalKind::Invoice]);
}

// ── local validation gate ────────────────────────────────────────────────

#[tokio::test]
async fn summary_mismatch_makes_zero_remote_calls() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);

    let mut req = request();
    req.summary.grand_total = 499_999;

    let err = agent
        .issue_invoice(&credentials("5452"), &req)
        .await
        .expect_err("mismatch must be rejected");
    assert_eq!(err.code(), "INVOICE_TOTALS_MISMATCH");
    assert_eq!(service.login_calls(), 0);
    assert_eq!(service.fetch_calls(), 0);
    assert_eq!(service.submit_calls(), 0);
    assert!(channel.seen().is_empty(), "no confirmation requested");
}

#[tokio::test]
async fn establishment_2_rejected_before_any_confirmation() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);

    let mut req = request();
    req.establishment = Some(2);

    let err = agent
        .issue_invoice(&credentials("5452"), &req)
        .await
        .expect_err("establishment 2 must be rejected");
    assert_eq!(err.code(), "INVOICE_CONSTRAINT_VIOLATION");
    assert!(channel.seen().is_empty());
    assert_eq!(service.submit_calls(), 0);
}

// ── authentication failures ──────────────────────────────────────────────

#[tokio::test]
async fn inactive_taxpayer_fails_before_configuration() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let creds = credentials("0452");

    let err = agent
        .issue_invoice(&creds, &request())
        .await
        .expect_err("inactive RUC must fail");
    assert_eq!(err.code(), "RUC_INACTIVE");
    assert_eq!(
        agent.session_state(&creds.ruc).await,
        SessionState::Unauthenticated
    );
    assert_eq!(service.fetch_calls(), 0, "no configuration fetched");
    assert!(channel.seen().is_empty());
}

// ── confirmation gating ──────────────────────────────────────────────────

#[tokio::test]
async fn configuration_denial_persists_and_caches_nothing() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::deny(ProposalKind::Configuration);
    let (agent, store) = agent(&service, &channel);
    let creds = credentials("5452");

    let err = agent
        .issue_invoice(&creds, &request())
        .await
        .expect_err("declined configuration must cancel");
    assert_eq!(err.code(), "USER_CANCELLED");
    assert_eq!(service.save_calls(), 0);
    assert_eq!(service.submit_calls(), 0);
    assert!(
        store.load(&creds.ruc).expect("load").is_none(),
        "nothing cached after denial"
    );
    assert_eq!(channel.seen(), vec![ProposalKind::Configuration]);
}

#[tokio::test]
async fn invoice_denial_prevents_submission() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::deny(ProposalKind::Invoice);
    let (agent, _store) = agent(&service, &channel);

    let err = agent
        .issue_invoice(&credentials("5452"), &request())
        .await
        .expect_err("declined invoice must cancel");
    assert_eq!(err.code(), "USER_CANCELLED");
    assert_eq!(service.save_calls(), 1, "configuration was approved");
    assert_eq!(service.submit_calls(), 0, "nothing submitted");
}

// ── retry policy ─────────────────────────────────────────────────────────

#[tokio::test]
async fn persistent_transport_failure_exhausts_three_attempts() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);

    service.fail_submissions_with(Some(TransportKind::Timeout));

    let err = agent
        .issue_invoice(&credentials("5452"), &request())
        .await
        .expect_err("exhausted retries must fail");
    assert_eq!(err.code(), "TRANSPORT_TIMEOUT");
    assert!(err.is_retryable(), "caller may retry the workflow");
    assert_eq!(service.submit_calls(), 3, "exactly 3 attempts");
}

#[tokio::test]
async fn rate_limiting_also_retries_to_exhaustion() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let creds = credentials("5452");

    // First issuance succeeds and configures.
    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("first call");

    service.fail_submissions_with(Some(TransportKind::RateLimited));
    let before = service.submit_calls();
    let err = agent
        .issue_invoice(&creds, &request())
        .await
        .expect_err("injected failure");
    assert_eq!(err.code(), "TRANSPORT_RATE_LIMITED");
    assert!(err.is_retryable());
    assert_eq!(service.submit_calls() - before, 3, "retryable kinds retry");
}

// ── reconciliation ───────────────────────────────────────────────────────

#[tokio::test]
async fn authoritative_change_refreshes_cache_without_reconfiguring() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, store) = agent(&service, &channel);
    let creds = credentials("5452");

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("first call");

    // The authority's copy changes behind the agent's back.
    let mut diverged = service
        .stored_configuration(&creds.ruc)
        .expect("configured");
    diverged.document_type = DocumentType::CreditNote;
    service.seed_configuration(&creds.ruc, diverged);

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("second call");

    // The authoritative copy won and was written through; no new
    // save_configuration happened.
    assert_eq!(service.save_calls(), 1);
    let cached = store.load(&creds.ruc).expect("load").expect("cached");
    assert_eq!(cached.value.document_type, DocumentType::CreditNote);
}

#[tokio::test]
async fn unreachable_source_surfaces_retrieval_failure() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let creds = credentials("5452");

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("first call");

    service.fail_fetches_with(Some(TransportKind::TemporarilyUnavailable));
    let before = service.submit_calls();
    let err = agent
        .issue_invoice(&creds, &request())
        .await
        .expect_err("stale copy must not be served as verified");
    assert_eq!(err.code(), "CONFIG_RETRIEVAL_FAILED");
    assert_eq!(service.submit_calls(), before, "nothing submitted");
}

// ── invalidation ─────────────────────────────────────────────────────────

#[tokio::test]
async fn invalidation_is_idempotent_and_forces_refetch() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, store) = agent(&service, &channel);
    let creds = credentials("5452");

    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("first call");
    assert!(store.load(&creds.ruc).expect("load").is_some());

    agent
        .invalidate_configuration(&creds.ruc, InvalidationTrigger::SecurityCodeUpdate)
        .expect("first invalidation");
    agent
        .invalidate_configuration(&creds.ruc, InvalidationTrigger::SecurityCodeUpdate)
        .expect("second invalidation is a no-op");
    assert!(store.load(&creds.ruc).expect("load").is_none());

    // The next call refetches from the authority (which still holds the
    // saved configuration) and does not reconfigure.
    agent
        .issue_invoice(&creds, &request())
        .await
        .expect("post-invalidation call");
    assert_eq!(service.save_calls(), 1);
    assert!(store.load(&creds.ruc).expect("load").is_some(), "re-cached");
}

// ── concurrency ──────────────────────────────────────────────────────────

#[tokio::test]
async fn concurrent_calls_for_one_taxpayer_configure_once() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, _store) = agent(&service, &channel);
    let agent = Arc::new(agent);
    let creds = credentials("5452");

    let req_a = request();
    let req_b = request();
    let (a, b) = tokio::join!(
        agent.issue_invoice(&creds, &req_a),
        agent.issue_invoice(&creds, &req_b),
    );
    a.expect("first concurrent call");
    b.expect("second concurrent call");

    // The per-taxpayer critical section prevents double authentication
    // and conflicting configuration writes.
    assert_eq!(service.login_calls(), 1);
    assert_eq!(service.save_calls(), 1);
    assert_eq!(service.submit_calls(), 2);
}

#[tokio::test]
async fn distinct_taxpayers_do_not_share_state() {
    let service = Arc::new(MockSifenService::new());
    let channel = RecordingChannel::approve_all();
    let (agent, store) = agent(&service, &channel);
    let first = credentials("5452");
    let second = credentials("80012345");

    agent
        .issue_invoice(&first, &request())
        .await
        .expect("first taxpayer");
    agent
        .issue_invoice(&second, &request())
        .await
        .expect("second taxpayer");

    assert_eq!(service.login_calls(), 2, "one session per taxpayer");
    assert_eq!(service.save_calls(), 2, "one configuration per taxpayer");
    assert!(store.load(&first.ruc).expect("load").is_some());
    assert!(store.load(&second.ruc).expect("load").is_some());
}
