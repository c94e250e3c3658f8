//! Gateway error taxonomy.
//!
//! One closed enum for everything the gateway can say went wrong. Each
//! variant maps to exactly one HTTP status (see `http::response`) and
//! carries a stable machine-readable tag for client dispatch.

use axum::http::StatusCode;
use bytes::Bytes;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    /// The breaker rejected the call without dialing.
    #[error("service '{service}' unavailable, circuit breaker is open")]
    CircuitOpen { service: String },

    /// The guarded call exceeded its per-call budget.
    #[error("service '{service}' did not respond within {timeout_ms}ms")]
    CircuitTimeout { service: String, timeout_ms: u64 },

    /// The downstream answered with an error status.
    #[error("service '{service}' responded with {status}")]
    Downstream {
        service: String,
        status: StatusCode,
        body: Bytes,
    },

    /// The downstream could not be reached at all.
    #[error("could not reach service '{service}': {reason}")]
    Connection { service: String, reason: String },

    /// The client exhausted its window.
    #[error("too many requests, retry in {retry_after_secs}s")]
    RateLimitExceeded { retry_after_secs: u64 },

    /// Protected route, no bearer token.
    #[error("authorization token required")]
    AuthMissing,

    /// Token present but expired, malformed, or badly signed.
    #[error("authorization token rejected")]
    AuthInvalid,

    /// No downstream is mapped to the requested prefix.
    #[error("unknown service '{0}'")]
    UnknownService(String),
}

impl GatewayError {
    /// Stable tag carried in the `error` field of every error body.
    pub fn tag(&self) -> &'static str {
        match self {
            GatewayError::CircuitOpen { .. } => "circuit_open",
            GatewayError::CircuitTimeout { .. } => "gateway_timeout",
            GatewayError::Downstream { .. } => "downstream_error",
            GatewayError::Connection { .. } => "service_unavailable",
            GatewayError::RateLimitExceeded { .. } => "rate_limit_exceeded",
            GatewayError::AuthMissing => "missing_token",
            GatewayError::AuthInvalid => "invalid_token",
            GatewayError::UnknownService(_) => "unknown_service",
        }
    }

    /// Whether a retry could plausibly succeed. Connection failures and
    /// downstream 5xx qualify; a 4xx is the downstream's final answer.
    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::Connection { .. } => true,
            GatewayError::Downstream { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_and_server_errors_are_retryable() {
        let conn = GatewayError::Connection {
            service: "usuarios".into(),
            reason: "connection refused".into(),
        };
        assert!(conn.is_retryable());

        let five_hundred = GatewayError::Downstream {
            service: "pagos".into(),
            status: StatusCode::BAD_GATEWAY,
            body: Bytes::new(),
        };
        assert!(five_hundred.is_retryable());
    }

    #[test]
    fn client_errors_and_breaker_rejections_are_not() {
        let not_found = GatewayError::Downstream {
            service: "cursos".into(),
            status: StatusCode::NOT_FOUND,
            body: Bytes::new(),
        };
        assert!(!not_found.is_retryable());
        assert!(!GatewayError::CircuitOpen { service: "cursos".into() }.is_retryable());
        assert!(!GatewayError::AuthInvalid.is_retryable());
    }

    #[test]
    fn tags_are_stable() {
        assert_eq!(
            GatewayError::CircuitOpen { service: "usuarios".into() }.tag(),
            "circuit_open"
        );
        assert_eq!(GatewayError::AuthMissing.tag(), "missing_token");
        assert_eq!(
            GatewayError::UnknownService("matriculas".into()).tag(),
            "unknown_service"
        );
    }
}
