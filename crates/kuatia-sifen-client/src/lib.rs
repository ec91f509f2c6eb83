//! # kuatia-sifen-client — Typed SIFEN Client
//!
//! Client layer for SIFEN, Paraguay's national electronic-invoicing
//! service: the [`SifenService`] capability trait the issuing agent
//! depends on, the live HTTP adapter, the retry policy, and a
//! deterministic mock for tests.
//!
//! ## Architecture
//!
//! The agent composes a `dyn SifenService` without knowing whether it is
//! talking to the live API or the mock. Retry policy deliberately lives
//! outside the adapters — callers wrap the calls they consider retryable
//! with [`retry::with_retry`], which consults the classified error
//! taxonomy and backs off exponentially on transient transport failures
//! only.

pub mod http;
pub mod mock;
pub mod retry;
pub mod service;

pub use http::{HttpSifenService, SifenEndpoint};
pub use mock::MockSifenService;
pub use retry::{with_retry, RetryPolicy};
pub use service::{ConfigReceipt, InvoiceSubmission, LoginOutcome, SifenService};
