//! Retry logic with exponential backoff for remote SIFEN calls.
//!
//! Retries only on failures the error taxonomy classifies as retryable
//! (transient transport kinds). Terminal errors — authentication,
//! configuration, validation, cancellation — are returned immediately
//! without retry.

use std::future::Future;
use std::time::Duration;

use kuatia_core::AgentError;

/// Retry policy: total attempt budget and the base backoff delay.
///
/// The delay doubles after each failed attempt. With the defaults, a
/// persistently failing call is attempted 3 times with sleeps of 1s and
/// 2s between attempts before the last classified error is returned
/// unchanged.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles each attempt after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

/// Run `f` under the retry policy.
///
/// The closure is called up to `policy.max_attempts` times. Only errors
/// whose [`AgentError::is_retryable`] flag is set trigger a retry; the
/// error from the final attempt is returned unchanged, never wrapped or
/// reclassified.
pub async fn with_retry<F, Fut, T>(
    policy: RetryPolicy,
    operation: &str,
    f: F,
) -> Result<T, AgentError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, AgentError>>,
{
    let mut delay = policy.base_delay;
    // Attempts with backoff, then one final attempt without a sleep after it.
    for attempt in 1..policy.max_attempts.max(1) {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) if err.is_retryable() => {
                tracing::warn!(
                    operation,
                    attempt,
                    max_attempts = policy.max_attempts,
                    code = err.code(),
                    "retryable failure, backing off {delay:?}: {err}"
                );
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(err) => return Err(err),
        }
    }
    f().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuatia_core::{AuthFailureReason, TransportKind};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn transport_timeout() -> AgentError {
        AgentError::Transport {
            kind: TransportKind::Timeout,
            detail: "submit_invoice".into(),
        }
    }

    #[tokio::test]
    async fn exhausts_all_attempts_on_persistent_transport_failure() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();

        let result: Result<(), AgentError> = with_retry(fast_policy(), "submit_invoice", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(transport_timeout())
            }
        })
        .await;

        let err = result.expect_err("must fail after exhausting retries");
        assert_eq!(err.code(), "TRANSPORT_TIMEOUT");
        assert_eq!(calls.load(Ordering::SeqCst), 3, "exactly 3 attempts");
    }

    #[tokio::test]
    async fn terminal_error_is_not_retried() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();

        let result: Result<(), AgentError> = with_retry(fast_policy(), "login", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(AgentError::Authentication {
                    reason: AuthFailureReason::InvalidCredentials,
                    detail: "rejected".into(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1, "no retry on terminal error");
    }

    #[tokio::test]
    async fn succeeds_after_transient_failures() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();

        let result = with_retry(fast_policy(), "submit_invoice", || {
            let cc = cc.clone();
            async move {
                if cc.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transport_timeout())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.expect("third attempt succeeds"), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn delays_double_between_attempts() {
        let calls = Arc::new(AtomicU32::new(0));
        let cc = calls.clone();
        let policy = RetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(20),
        };

        let started = std::time::Instant::now();
        let _: Result<(), AgentError> = with_retry(policy, "submit_invoice", || {
            let cc = cc.clone();
            async move {
                cc.fetch_add(1, Ordering::SeqCst);
                Err(transport_timeout())
            }
        })
        .await;

        // Sleeps of 20ms then 40ms must have elapsed.
        assert!(started.elapsed() >= Duration::from_millis(60));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
