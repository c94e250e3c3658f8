//! Circuit breaker telemetry sink.

use crate::error::GatewayError;
use crate::observability::metrics;
use crate::resilience::{BreakerObserver, BreakerState};

/// Logs breaker transitions and feeds the transition counter. Failures
/// here can only be log-write failures, which tracing swallows, so the
/// hook never disturbs breaker state.
pub struct BreakerTelemetry;

impl BreakerObserver for BreakerTelemetry {
    fn on_state_change(&self, name: &str, old: BreakerState, new: BreakerState) {
        match new {
            BreakerState::Open => tracing::warn!(
                breaker = name,
                from = %old,
                to = %new,
                "circuit breaker opened"
            ),
            _ => tracing::info!(
                breaker = name,
                from = %old,
                to = %new,
                "circuit breaker state change"
            ),
        }
        metrics::record_breaker_transition(name, new.as_str());
    }

    fn on_failure(&self, name: &str, error: &GatewayError) {
        tracing::debug!(breaker = name, error = %error, "breaker recorded failure");
    }
}
