//! Bounded retry around a single downstream call.
//!
//! # Design Decisions
//! - Only connection errors and 5xx responses are retried; a 4xx
//!   short-circuits without delay
//! - Exhausting the budget rethrows the last error unchanged
//! - Backoff doubles per attempt with jitter (see `backoff`)

use std::future::Future;

use super::backoff::calculate_backoff;
use crate::error::GatewayError;

/// Retry budget for one forwarded request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Attempt `call`, retrying retryable failures with exponential backoff
/// until the budget is exhausted.
pub async fn execute_with_retry<F, Fut, T>(
    policy: &RetryPolicy,
    mut call: F,
) -> Result<T, GatewayError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, GatewayError>>,
{
    let mut failures = 0;
    loop {
        match call().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                failures += 1;
                if failures > policy.max_retries || !err.is_retryable() {
                    return Err(err);
                }
                let delay = calculate_backoff(failures, policy.base_delay_ms, policy.max_delay_ms);
                tracing::debug!(
                    attempt = failures,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying downstream call"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use bytes::Bytes;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    fn server_error() -> GatewayError {
        GatewayError::Downstream {
            service: "pagos".into(),
            status: StatusCode::INTERNAL_SERVER_ERROR,
            body: Bytes::new(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_five_hundreds_then_returns_success() {
        let policy = RetryPolicy {
            max_retries: 3,
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        };
        let attempts = AtomicU32::new(0);
        let stamps = Mutex::new(Vec::new());

        let result = execute_with_retry(&policy, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            stamps.lock().unwrap().push(Instant::now());
            async move {
                if n < 2 {
                    Err(server_error())
                } else {
                    Ok("enrolled")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "enrolled");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);

        // Gaps of base and 2*base, each padded by at most 10% jitter.
        let stamps = stamps.lock().unwrap();
        let first_gap = (stamps[1] - stamps[0]).as_millis() as u64;
        let second_gap = (stamps[2] - stamps[1]).as_millis() as u64;
        assert!((100..=110).contains(&first_gap), "first gap {first_gap}ms");
        assert!((200..=220).contains(&second_gap), "second gap {second_gap}ms");
    }

    #[tokio::test(start_paused = true)]
    async fn client_errors_are_not_retried() {
        let policy = RetryPolicy::default();
        let attempts = AtomicU32::new(0);

        let started = Instant::now();
        let result: Result<(), _> = execute_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(GatewayError::Downstream {
                    service: "cursos".into(),
                    status: StatusCode::NOT_FOUND,
                    body: Bytes::new(),
                })
            }
        })
        .await;

        assert!(matches!(
            result,
            Err(GatewayError::Downstream { status: StatusCode::NOT_FOUND, .. })
        ));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
        // Short-circuit: no backoff sleep happened.
        assert_eq!(started.elapsed().as_millis(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_budget_rethrows_last_error() {
        let policy = RetryPolicy {
            max_retries: 2,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async {
                Err(GatewayError::Connection {
                    service: "usuarios".into(),
                    reason: "connection refused".into(),
                })
            }
        })
        .await;

        assert!(matches!(result, Err(GatewayError::Connection { .. })));
        // First attempt plus two retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn zero_budget_means_single_attempt() {
        let policy = RetryPolicy {
            max_retries: 0,
            base_delay_ms: 10,
            max_delay_ms: 100,
        };
        let attempts = AtomicU32::new(0);

        let result: Result<(), _> = execute_with_retry(&policy, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(server_error()) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }
}
