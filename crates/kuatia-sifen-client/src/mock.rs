//! # Mock SIFEN Service
//!
//! Deterministic, stateful in-memory implementation of [`SifenService`]
//! for tests and development.
//!
//! ## Conventions
//!
//! Login outcomes follow RUC prefix conventions:
//! - RUCs starting with `0` are treated as inactive taxpayers
//! - RUCs starting with `9` are treated as enrollment-pending taxpayers
//! - an empty secret key is rejected as invalid credentials
//! - every other RUC authenticates successfully
//!
//! ## State & Introspection
//!
//! Saved configurations are held in a `DashMap` keyed by RUC, so the mock
//! behaves as the authoritative source across calls. Atomic call counters
//! and transport-failure injection switches let orchestration tests assert
//! exactly which remote operations a workflow performed.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use dashmap::DashMap;

use kuatia_core::{
    AgentError, AuthFailureReason, Credentials, EconomicActivity, InvoiceResult,
    IssuerConfiguration, Profile, Ruc, SecurityCode, Session, SessionToken, StampNumber,
    TaxpayerStatus, TaxpayerType, TransportKind,
};

use crate::service::{ConfigReceipt, InvoiceSubmission, LoginOutcome, SifenService};

/// Deterministic mock of the remote SIFEN backend.
pub struct MockSifenService {
    configs: DashMap<String, IssuerConfiguration>,
    login_calls: AtomicU32,
    fetch_calls: AtomicU32,
    save_calls: AtomicU32,
    submit_calls: AtomicU32,
    sequence: AtomicU32,
    fail_fetches: Mutex<Option<TransportKind>>,
    fail_submissions: Mutex<Option<TransportKind>>,
}

impl Default for MockSifenService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSifenService {
    /// Create an empty mock with no stored configurations.
    pub fn new() -> Self {
        Self {
            configs: DashMap::new(),
            login_calls: AtomicU32::new(0),
            fetch_calls: AtomicU32::new(0),
            save_calls: AtomicU32::new(0),
            submit_calls: AtomicU32::new(0),
            sequence: AtomicU32::new(0),
            fail_fetches: Mutex::new(None),
            fail_submissions: Mutex::new(None),
        }
    }

    /// Seed the authoritative configuration for a taxpayer, as if issuer
    /// setup had completed in an earlier session.
    pub fn seed_configuration(&self, ruc: &Ruc, config: IssuerConfiguration) {
        self.configs.insert(ruc.as_str().to_string(), config);
    }

    /// The configuration currently held for a taxpayer, if any.
    pub fn stored_configuration(&self, ruc: &Ruc) -> Option<IssuerConfiguration> {
        self.configs.get(ruc.as_str()).map(|c| c.clone())
    }

    /// Make every `fetch_current_configuration` fail with the given
    /// transport kind (`None` restores normal behavior).
    pub fn fail_fetches_with(&self, kind: Option<TransportKind>) {
        *self
            .fail_fetches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = kind;
    }

    /// Make every `submit_invoice` fail with the given transport kind
    /// (`None` restores normal behavior).
    pub fn fail_submissions_with(&self, kind: Option<TransportKind>) {
        *self
            .fail_submissions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = kind;
    }

    /// Number of `login` calls observed.
    pub fn login_calls(&self) -> u32 {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Number of `fetch_current_configuration` calls observed.
    pub fn fetch_calls(&self) -> u32 {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    /// Number of `save_configuration` calls observed.
    pub fn save_calls(&self) -> u32 {
        self.save_calls.load(Ordering::SeqCst)
    }

    /// Number of `submit_invoice` calls observed.
    pub fn submit_calls(&self) -> u32 {
        self.submit_calls.load(Ordering::SeqCst)
    }

    /// Deterministic profile for an authenticated RUC.
    fn profile_for(ruc: &Ruc) -> Profile {
        Profile {
            business_name: format!("Mock Comercial {} S.A.", ruc.as_str()),
            status: TaxpayerStatus::Active,
            economic_activity: EconomicActivity {
                code: "47190".into(),
                description: "Retail trade".into(),
            },
            taxpayer_type: TaxpayerType::LegalEntity,
            approval_date: NaiveDate::from_ymd_opt(2023, 3, 1).expect("valid date"),
            stamp_number: StampNumber::new("12558946").expect("valid stamp"),
            stamp_valid_from: NaiveDate::from_ymd_opt(2023, 3, 1).expect("valid date"),
            security_code: SecurityCode::new("123456789").expect("valid CSC"),
        }
    }

    fn check_token(token: &SessionToken, operation: &str) -> Result<(), AgentError> {
        if token.as_str().starts_with("mock-token-") {
            Ok(())
        } else {
            Err(AgentError::Authentication {
                reason: AuthFailureReason::InvalidCredentials,
                detail: format!("{operation}: session token rejected"),
            })
        }
    }
}

#[async_trait]
impl SifenService for MockSifenService {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AgentError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);

        if credentials.secret_key.expose().is_empty() {
            return Err(AgentError::Authentication {
                reason: AuthFailureReason::InvalidCredentials,
                detail: "login: secret key rejected".into(),
            });
        }
        match credentials.ruc.as_str().as_bytes().first() {
            Some(b'0') => {
                return Err(AgentError::Authentication {
                    reason: AuthFailureReason::RucInactive,
                    detail: format!("login: RUC {} is inactive", credentials.ruc),
                });
            }
            Some(b'9') => {
                return Err(AgentError::Authentication {
                    reason: AuthFailureReason::EnrollmentNotApproved,
                    detail: format!("login: enrollment for RUC {} pending", credentials.ruc),
                });
            }
            _ => {}
        }

        Ok(LoginOutcome {
            session: Session::new(SessionToken::new(format!(
                "mock-token-{}",
                credentials.ruc.as_str()
            ))),
            profile: Self::profile_for(&credentials.ruc),
        })
    }

    async fn fetch_current_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
    ) -> Result<Option<IssuerConfiguration>, AgentError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_token(token, "fetch_current_configuration")?;

        let injected = *self
            .fail_fetches
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(kind) = injected {
            return Err(AgentError::Transport {
                kind,
                detail: "fetch_current_configuration: injected failure".into(),
            });
        }

        Ok(self.configs.get(ruc.as_str()).map(|c| c.clone()))
    }

    async fn save_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
        config: &IssuerConfiguration,
    ) -> Result<ConfigReceipt, AgentError> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_token(token, "save_configuration")?;

        // The remote side enforces the same fixed constraints.
        config.validate()?;

        self.configs
            .insert(ruc.as_str().to_string(), config.clone());
        Ok(ConfigReceipt {
            config_id: format!("CFG-MOCK-{}", ruc.as_str()),
        })
    }

    async fn submit_invoice(
        &self,
        token: &SessionToken,
        submission: &InvoiceSubmission,
    ) -> Result<InvoiceResult, AgentError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        Self::check_token(token, "submit_invoice")?;

        let injected = *self
            .fail_submissions
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(kind) = injected {
            return Err(AgentError::Transport {
                kind,
                detail: "submit_invoice: injected failure".into(),
            });
        }

        let seq = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(InvoiceResult {
            document_id: format!("001-001-{seq:07}"),
            control_code: format!("MOCK-CDC-{}-{seq:06}", submission.ruc.as_str()),
            issued_at: Utc::now(),
        })
    }

    fn service_name(&self) -> &str {
        "MockSifenService"
    }
}
