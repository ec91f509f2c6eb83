//! # HTTP Adapter for the Live SIFEN API
//!
//! Production implementation of [`SifenService`] over reqwest.
//!
//! ## Error Handling
//!
//! Every transport- and status-level failure is mapped into the classified
//! taxonomy with diagnostic context including the endpoint and a response
//! body excerpt. `reqwest::Error` never crosses this module's boundary.
//!
//! Status mapping:
//!
//! - connect failures and timeouts → `Transport` (`TemporarilyUnavailable`
//!   / `Timeout`)
//! - 429 → `Transport` (`RateLimited`)
//! - 5xx → `Transport` (`TemporarilyUnavailable`)
//! - 401/403 → `Authentication`, sub-reason taken from the body's machine
//!   code (the session token being rejected is an authentication failure,
//!   which is what lets the orchestrator invalidate the session)
//! - endpoint-specific 4xx → `Configuration` / `InvoiceValidation`
//!
//! ## Timeout & Retry
//!
//! Each request uses the configured per-request timeout. Retries are NOT
//! built into the adapter — callers own retry policy via [`crate::retry`].

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use url::Url;

use kuatia_core::{
    AgentError, AuthFailureReason, ConfigFailureReason, Credentials, InvoiceRejection,
    InvoiceResult, IssuerConfiguration, Profile, Ruc, Session, SessionToken, TransportKind,
};

use crate::service::{ConfigReceipt, InvoiceSubmission, LoginOutcome, SifenService};

/// Configuration for the SIFEN HTTP adapter.
#[derive(Debug, Clone)]
pub struct SifenEndpoint {
    /// Base URL of the SIFEN API (e.g. `https://sifen.set.gov.py/api/v1`).
    pub base_url: String,
    /// Per-request timeout in seconds (default: 30).
    pub timeout_secs: u64,
}

impl SifenEndpoint {
    /// Create an endpoint configuration with the default timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: 30,
        }
    }
}

/// Live HTTP client for the SIFEN electronic-invoicing service.
#[derive(Debug)]
pub struct HttpSifenService {
    client: reqwest::Client,
    base_url: String,
    timeout_secs: u64,
}

/// Machine-readable error body returned by the SIFEN API.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Wire shape of a successful login response.
#[derive(Debug, Deserialize)]
struct LoginBody {
    token: String,
    profile: Profile,
}

impl HttpSifenService {
    /// Build the adapter from an endpoint configuration.
    ///
    /// # Errors
    ///
    /// Returns [`AgentError::ConfigurationRetrieval`] if the base URL is
    /// malformed or the HTTP client cannot be constructed; the service is
    /// unreachable by definition in either case.
    pub fn new(endpoint: SifenEndpoint) -> Result<Self, AgentError> {
        Url::parse(&endpoint.base_url).map_err(|e| AgentError::ConfigurationRetrieval {
            detail: format!("invalid SIFEN base URL {:?}: {e}", endpoint.base_url),
        })?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(endpoint.timeout_secs))
            .default_headers({
                let mut headers = reqwest::header::HeaderMap::new();
                headers.insert(
                    reqwest::header::CONTENT_TYPE,
                    reqwest::header::HeaderValue::from_static("application/json"),
                );
                headers
            })
            .build()
            .map_err(|e| AgentError::ConfigurationRetrieval {
                detail: format!("failed to build HTTP client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url: endpoint.base_url.trim_end_matches('/').to_string(),
            timeout_secs: endpoint.timeout_secs,
        })
    }

    /// Send a request, classifying transport failures and the statuses
    /// every endpoint maps identically (429, 5xx).
    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        endpoint: &str,
    ) -> Result<reqwest::Response, AgentError> {
        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                AgentError::Transport {
                    kind: TransportKind::Timeout,
                    detail: format!("{endpoint}: no response within {}s", self.timeout_secs),
                }
            } else {
                AgentError::Transport {
                    kind: TransportKind::TemporarilyUnavailable,
                    detail: format!("{endpoint}: {e}"),
                }
            }
        })?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(AgentError::Transport {
                kind: TransportKind::RateLimited,
                detail: format!("{endpoint}: HTTP 429"),
            });
        }
        if status.is_server_error() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AgentError::Transport {
                kind: TransportKind::TemporarilyUnavailable,
                detail: format!("{endpoint}: HTTP {status} — {body}"),
            });
        }

        Ok(resp)
    }

    /// Decode the machine error body, tolerating non-JSON responses.
    async fn error_body(resp: reqwest::Response) -> ErrorBody {
        let text = resp.text().await.unwrap_or_default();
        serde_json::from_str(&text).unwrap_or(ErrorBody {
            code: None,
            message: Some(text),
        })
    }

    /// Map a 401/403 body onto the authentication sub-reasons.
    fn auth_error(endpoint: &str, body: ErrorBody) -> AgentError {
        let reason = match body.code.as_deref() {
            Some("RUC_INACTIVE") => AuthFailureReason::RucInactive,
            Some("ENROLLMENT_NOT_APPROVED") => AuthFailureReason::EnrollmentNotApproved,
            _ => AuthFailureReason::InvalidCredentials,
        };
        AgentError::Authentication {
            reason,
            detail: format!(
                "{endpoint}: {}",
                body.message.unwrap_or_else(|| "rejected".into())
            ),
        }
    }

    /// Decode a JSON success body, classifying decode failures as
    /// transient (a garbled body is indistinguishable from a broken
    /// intermediary).
    async fn decode<T: serde::de::DeserializeOwned>(
        resp: reqwest::Response,
        endpoint: &str,
    ) -> Result<T, AgentError> {
        resp.json().await.map_err(|e| AgentError::Transport {
            kind: TransportKind::TemporarilyUnavailable,
            detail: format!("{endpoint}: response deserialization failed: {e}"),
        })
    }
}

#[async_trait]
impl SifenService for HttpSifenService {
    async fn login(&self, credentials: &Credentials) -> Result<LoginOutcome, AgentError> {
        let url = format!("{}/auth/login", self.base_url);
        let body = serde_json::json!({
            "ruc": credentials.ruc.as_str(),
            "secret_key": credentials.secret_key.expose(),
            "emission_mode": credentials.emission_mode.code(),
        });

        let resp = self.send(self.client.post(&url).json(&body), "login").await?;

        if resp.status().is_client_error() {
            return Err(Self::auth_error("login", Self::error_body(resp).await));
        }

        let body: LoginBody = Self::decode(resp, "login").await?;
        Ok(LoginOutcome {
            session: Session::new(SessionToken::new(body.token)),
            profile: body.profile,
        })
    }

    async fn fetch_current_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
    ) -> Result<Option<IssuerConfiguration>, AgentError> {
        let url = format!("{}/taxpayers/{}/configuration", self.base_url, ruc.as_str());
        let resp = self
            .send(
                self.client.get(&url).bearer_auth(token.as_str()),
                "fetch_current_configuration",
            )
            .await?;

        match resp.status().as_u16() {
            404 => Ok(None),
            401 | 403 => Err(Self::auth_error(
                "fetch_current_configuration",
                Self::error_body(resp).await,
            )),
            _ if resp.status().is_client_error() => {
                let body = Self::error_body(resp).await;
                Err(AgentError::ConfigurationRetrieval {
                    detail: format!(
                        "fetch_current_configuration: {}",
                        body.message.unwrap_or_else(|| "rejected".into())
                    ),
                })
            }
            _ => Ok(Some(
                Self::decode(resp, "fetch_current_configuration").await?,
            )),
        }
    }

    async fn save_configuration(
        &self,
        ruc: &Ruc,
        token: &SessionToken,
        config: &IssuerConfiguration,
    ) -> Result<ConfigReceipt, AgentError> {
        let url = format!("{}/taxpayers/{}/configuration", self.base_url, ruc.as_str());
        let resp = self
            .send(
                self.client.put(&url).bearer_auth(token.as_str()).json(config),
                "save_configuration",
            )
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Self::auth_error(
                "save_configuration",
                Self::error_body(resp).await,
            ));
        }
        if status.is_client_error() {
            let body = Self::error_body(resp).await;
            let reason = match body.code.as_deref() {
                Some("CONFIG_MISSING_CERTIFICATE") => ConfigFailureReason::MissingCertificate,
                Some("CONFIG_INVALID_SECURITY_CODE") => ConfigFailureReason::InvalidSecurityCode,
                _ => ConfigFailureReason::ConstraintViolation,
            };
            return Err(AgentError::Configuration {
                reason,
                detail: format!(
                    "save_configuration: {}",
                    body.message.unwrap_or_else(|| "rejected".into())
                ),
            });
        }

        Self::decode(resp, "save_configuration").await
    }

    async fn submit_invoice(
        &self,
        token: &SessionToken,
        submission: &InvoiceSubmission,
    ) -> Result<InvoiceResult, AgentError> {
        let url = format!("{}/documents/invoices", self.base_url);
        let resp = self
            .send(
                self.client
                    .post(&url)
                    .bearer_auth(token.as_str())
                    .json(submission),
                "submit_invoice",
            )
            .await?;

        let status = resp.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(Self::auth_error(
                "submit_invoice",
                Self::error_body(resp).await,
            ));
        }
        if status.as_u16() == 409 {
            let body = Self::error_body(resp).await;
            return Err(AgentError::InvoiceValidation {
                reason: InvoiceRejection::DuplicateDocument,
                detail: format!(
                    "submit_invoice: {}",
                    body.message.unwrap_or_else(|| "duplicate".into())
                ),
            });
        }
        if status.is_client_error() {
            let body = Self::error_body(resp).await;
            let reason = match body.code.as_deref() {
                Some("INVOICE_STAMP_EXPIRED") => InvoiceRejection::StampExpired,
                Some("INVOICE_INVALID_RECIPIENT") => InvoiceRejection::InvalidRecipient,
                Some("INVOICE_NON_POSITIVE_AMOUNT") => InvoiceRejection::NonPositiveAmount,
                _ => InvoiceRejection::ConstraintViolation,
            };
            return Err(AgentError::InvoiceValidation {
                reason,
                detail: format!(
                    "submit_invoice: {}",
                    body.message.unwrap_or_else(|| "rejected".into())
                ),
            });
        }

        Self::decode(resp, "submit_invoice").await
    }

    fn service_name(&self) -> &str {
        "HttpSifenService"
    }
}
