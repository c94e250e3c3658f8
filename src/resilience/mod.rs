//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Forwarded request:
//!     → circuit_breaker.rs (admission check, per-call timeout)
//!         → retry.rs (retry retryable failures)
//!             → backoff.rs (delay between attempts)
//!     → registry.rs (one breaker per downstream service)
//! ```
//!
//! # Design Decisions
//! - The breaker wraps the whole retry loop: one admission, one timeout
//!   budget per forwarded request
//! - A request that exhausted its retry budget is never retried again
//!   at a higher layer
//! - State transitions are observable but observers cannot fail them

pub mod backoff;
pub mod circuit_breaker;
pub mod registry;
pub mod retry;

pub use circuit_breaker::{
    BreakerConfig, BreakerObserver, BreakerSnapshot, BreakerState, CircuitBreaker,
};
pub use registry::{BreakerAggregate, BreakerRegistry};
pub use retry::{execute_with_retry, RetryPolicy};
