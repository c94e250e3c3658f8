//! Circuit breaker for downstream service protection.
//!
//! # States
//! - Closed: normal operation, calls pass through
//! - Open: service assumed down, calls fail fast
//! - Half-Open: testing whether the service recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count >= failure_threshold
//! Open → Half-Open: after reset_timeout_ms
//! Half-Open → Closed: probe call succeeds
//! Half-Open → Open: probe call fails
//! ```
//!
//! # Design Decisions
//! - One breaker per downstream service (not global)
//! - Fail fast in Open: rejected calls never reach the network
//! - Exactly one probe call in Half-Open; concurrent calls during the
//!   probe are rejected
//! - Observer hooks fire outside the state lock and cannot fail
//! - Timing uses `tokio::time::Instant` so tests run under paused time

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::time::{Duration, Instant};

use crate::error::GatewayError;

/// Breaker state as exposed on the admin surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BreakerState::Closed => "CLOSED",
            BreakerState::Open => "OPEN",
            BreakerState::HalfOpen => "HALF_OPEN",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tuning knobs for one breaker instance.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,

    /// Budget for one guarded call in milliseconds.
    pub call_timeout_ms: u64,

    /// Cooldown before an open circuit admits a probe.
    pub reset_timeout_ms: u64,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            call_timeout_ms: 5_000,
            reset_timeout_ms: 30_000,
        }
    }
}

/// Telemetry hooks invoked on breaker activity.
///
/// All methods have no-op defaults and are infallible: a sink that wants
/// to fail must swallow its own errors.
pub trait BreakerObserver: Send + Sync {
    fn on_state_change(&self, _name: &str, _old: BreakerState, _new: BreakerState) {}
    fn on_success(&self, _name: &str) {}
    fn on_failure(&self, _name: &str, _error: &GatewayError) {}
}

/// Point-in-time view of a breaker, serialized for `/circuit-breakers`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerSnapshot {
    pub name: String,
    pub state: BreakerState,
    pub failure_count: u32,
    pub success_count: u32,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub rejected_requests: u64,
    pub open_count: u64,
    pub close_count: u64,
    pub last_failure_ms_ago: Option<u64>,
}

/// Mutable state, guarded by one mutex per breaker.
struct Core {
    state: BreakerState,
    failure_count: u32,
    success_count: u32,
    probe_in_flight: bool,
    last_failure: Option<Instant>,
    next_attempt: Option<Instant>,
    total_requests: u64,
    successful_requests: u64,
    failed_requests: u64,
    rejected_requests: u64,
    open_count: u64,
    close_count: u64,
}

impl Core {
    fn new() -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            success_count: 0,
            probe_in_flight: false,
            last_failure: None,
            next_attempt: None,
            total_requests: 0,
            successful_requests: 0,
            failed_requests: 0,
            rejected_requests: 0,
            open_count: 0,
            close_count: 0,
        }
    }
}

/// Per-service circuit breaker.
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    core: Mutex<Core>,
    observers: Vec<Arc<dyn BreakerObserver>>,
}

impl CircuitBreaker {
    pub fn new(
        name: impl Into<String>,
        config: BreakerConfig,
        observers: Vec<Arc<dyn BreakerObserver>>,
    ) -> Self {
        Self {
            name: name.into(),
            config,
            core: Mutex::new(Core::new()),
            observers,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn config(&self) -> &BreakerConfig {
        &self.config
    }

    pub fn state(&self) -> BreakerState {
        self.lock().state
    }

    /// Run `call` guarded by the breaker and the per-call timeout.
    ///
    /// Rejected calls fail with `CircuitOpen` without invoking `call`;
    /// a call that neither resolves nor fails within `call_timeout_ms`
    /// fails with `CircuitTimeout` and counts as a failure.
    pub async fn execute<F, Fut, T>(&self, call: F) -> Result<T, GatewayError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        self.try_acquire()?;

        let budget = Duration::from_millis(self.config.call_timeout_ms);
        match tokio::time::timeout(budget, call()).await {
            Ok(Ok(value)) => {
                self.record_success();
                Ok(value)
            }
            Ok(Err(err)) => {
                self.record_failure(&err);
                Err(err)
            }
            Err(_elapsed) => {
                let err = GatewayError::CircuitTimeout {
                    service: self.name.clone(),
                    timeout_ms: self.config.call_timeout_ms,
                };
                self.record_failure(&err);
                Err(err)
            }
        }
    }

    /// Force the breaker back to Closed and zero the live counters.
    /// Cumulative totals are lifetime telemetry and survive.
    pub fn reset(&self) {
        let transition = {
            let mut core = self.lock();
            let old = core.state;
            core.state = BreakerState::Closed;
            core.failure_count = 0;
            core.success_count = 0;
            core.probe_in_flight = false;
            core.next_attempt = None;
            (old != BreakerState::Closed).then_some((old, BreakerState::Closed))
        };
        self.notify(transition);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let core = self.lock();
        BreakerSnapshot {
            name: self.name.clone(),
            state: core.state,
            failure_count: core.failure_count,
            success_count: core.success_count,
            total_requests: core.total_requests,
            successful_requests: core.successful_requests,
            failed_requests: core.failed_requests,
            rejected_requests: core.rejected_requests,
            open_count: core.open_count,
            close_count: core.close_count,
            last_failure_ms_ago: core
                .last_failure
                .map(|at| Instant::now().saturating_duration_since(at).as_millis() as u64),
        }
    }

    /// Admission check. Serializes the Open → Half-Open transition so a
    /// single probe is let through.
    fn try_acquire(&self) -> Result<(), GatewayError> {
        let (admitted, transition) = {
            let mut core = self.lock();
            core.total_requests += 1;

            match core.state {
                BreakerState::Closed => (true, None),
                BreakerState::Open => {
                    let elapsed = core
                        .next_attempt
                        .map(|at| Instant::now() >= at)
                        .unwrap_or(true);
                    if elapsed {
                        core.state = BreakerState::HalfOpen;
                        core.probe_in_flight = true;
                        (true, Some((BreakerState::Open, BreakerState::HalfOpen)))
                    } else {
                        core.rejected_requests += 1;
                        (false, None)
                    }
                }
                BreakerState::HalfOpen => {
                    if core.probe_in_flight {
                        core.rejected_requests += 1;
                        (false, None)
                    } else {
                        core.probe_in_flight = true;
                        (true, None)
                    }
                }
            }
        };

        self.notify(transition);
        if admitted {
            Ok(())
        } else {
            Err(GatewayError::CircuitOpen {
                service: self.name.clone(),
            })
        }
    }

    fn record_success(&self) {
        let transition = {
            let mut core = self.lock();
            core.successful_requests += 1;
            core.success_count += 1;
            core.failure_count = 0;

            if core.state == BreakerState::HalfOpen {
                core.state = BreakerState::Closed;
                core.probe_in_flight = false;
                core.next_attempt = None;
                core.close_count += 1;
                Some((BreakerState::HalfOpen, BreakerState::Closed))
            } else {
                None
            }
        };

        self.notify(transition);
        for observer in &self.observers {
            observer.on_success(&self.name);
        }
    }

    fn record_failure(&self, error: &GatewayError) {
        let transition = {
            let mut core = self.lock();
            core.failed_requests += 1;
            core.failure_count += 1;
            core.last_failure = Some(Instant::now());

            let reset_after = Duration::from_millis(self.config.reset_timeout_ms);
            match core.state {
                BreakerState::HalfOpen => {
                    core.state = BreakerState::Open;
                    core.probe_in_flight = false;
                    core.next_attempt = Some(Instant::now() + reset_after);
                    core.open_count += 1;
                    Some((BreakerState::HalfOpen, BreakerState::Open))
                }
                BreakerState::Closed if core.failure_count >= self.config.failure_threshold => {
                    core.state = BreakerState::Open;
                    core.next_attempt = Some(Instant::now() + reset_after);
                    core.open_count += 1;
                    Some((BreakerState::Closed, BreakerState::Open))
                }
                _ => None,
            }
        };

        self.notify(transition);
        for observer in &self.observers {
            observer.on_failure(&self.name, error);
        }
    }

    fn notify(&self, transition: Option<(BreakerState, BreakerState)>) {
        if let Some((old, new)) = transition {
            for observer in &self.observers {
                observer.on_state_change(&self.name, old, new);
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Core> {
        // A poisoned lock means a panic mid-transition; counters may be
        // stale but the state machine itself is still consistent.
        self.core.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
