//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! default to a working single-host demo setup (usuarios/cursos/pagos on
//! adjacent local ports).

use serde::{Deserialize, Serialize};

use crate::resilience::BreakerConfig;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Downstream service descriptors, keyed by route prefix.
    pub services: Vec<ServiceConfig>,

    /// Circuit breaker defaults applied to every service breaker.
    pub circuit_breaker: BreakerConfig,

    /// Retry backoff shape (per-service retry counts live on the service).
    pub retry: RetryConfig,

    /// Fixed-window rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Bearer-token authentication.
    pub auth: AuthConfig,

    /// In-memory request log retention.
    pub request_log: RequestLogConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Static descriptor for one downstream service. Read-only at runtime.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServiceConfig {
    /// Route prefix and breaker name (e.g., "usuarios" for /api/usuarios).
    pub name: String,

    /// Base URL of the downstream (e.g., "http://localhost:3001").
    pub base_url: String,

    /// Per-call budget in milliseconds.
    #[serde(default = "default_service_timeout_ms")]
    pub timeout_ms: u64,

    /// Retries allowed after the first attempt.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_service_timeout_ms() -> u64 {
    5_000
}

fn default_max_retries() -> u32 {
    3
}

/// Backoff shape for retried calls.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 100,
            max_delay_ms: 2_000,
        }
    }
}

/// Fixed-window rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per client per window.
    pub max_requests: u32,

    /// Window length in seconds.
    pub window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,
            window_secs: 15 * 60,
        }
    }
}

/// Bearer-token authentication configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Enable token verification.
    pub enabled: bool,

    /// Shared HS256 secret.
    pub jwt_secret: String,

    /// Path prefixes that bypass verification.
    pub public_paths: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            jwt_secret: "CHANGE_ME_IN_PRODUCTION".to_string(),
            public_paths: vec![
                "/health".to_string(),
                "/api/usuarios/login".to_string(),
                "/api/usuarios/registro".to_string(),
            ],
        }
    }
}

/// Request log retention configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RequestLogConfig {
    /// Entries older than this are evicted.
    pub retention_secs: u64,

    /// How often the maintenance task sweeps.
    pub sweep_interval_secs: u64,
}

impl Default for RequestLogConfig {
    fn default() -> Self {
        Self {
            retention_secs: 60 * 60,
            sweep_interval_secs: 60,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

impl GatewayConfig {
    /// Demo topology: the three campus services on adjacent local ports.
    pub fn demo() -> Self {
        Self {
            services: vec![
                ServiceConfig {
                    name: "usuarios".to_string(),
                    base_url: "http://localhost:3001".to_string(),
                    timeout_ms: default_service_timeout_ms(),
                    max_retries: default_max_retries(),
                },
                ServiceConfig {
                    name: "cursos".to_string(),
                    base_url: "http://localhost:3002".to_string(),
                    timeout_ms: default_service_timeout_ms(),
                    max_retries: default_max_retries(),
                },
                ServiceConfig {
                    name: "pagos".to_string(),
                    base_url: "http://localhost:3003".to_string(),
                    timeout_ms: default_service_timeout_ms(),
                    max_retries: default_max_retries(),
                },
            ],
            ..Self::default()
        }
    }

    pub fn service(&self, name: &str) -> Option<&ServiceConfig> {
        self.services.iter().find(|s| s.name == name)
    }

    /// Breaker config for one service: registry defaults plus the
    /// service's own call budget.
    pub fn breaker_config_for(&self, service: &ServiceConfig) -> BreakerConfig {
        BreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold,
            call_timeout_ms: service.timeout_ms,
            reset_timeout_ms: self.circuit_breaker.reset_timeout_ms,
        }
    }
}
