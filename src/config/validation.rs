//! Configuration validation.
//!
//! Semantic checks on top of what serde already guarantees. Returns all
//! violations at once rather than stopping at the first.

use std::collections::HashSet;

use super::schema::GatewayConfig;

/// One semantic violation found in a config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Pure semantic pass over a deserialized config.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError {
            field: "listener.bind_address".into(),
            message: format!("'{}' is not a valid socket address", config.listener.bind_address),
        });
    }

    if config.services.is_empty() {
        errors.push(ValidationError {
            field: "services".into(),
            message: "at least one downstream service must be configured".into(),
        });
    }

    let mut seen = HashSet::new();
    for (i, service) in config.services.iter().enumerate() {
        let field = format!("services[{i}]");
        if service.name.is_empty() || service.name.contains('/') {
            errors.push(ValidationError {
                field: format!("{field}.name"),
                message: format!("'{}' is not a usable route prefix", service.name),
            });
        }
        if !seen.insert(service.name.clone()) {
            errors.push(ValidationError {
                field: format!("{field}.name"),
                message: format!("duplicate service name '{}'", service.name),
            });
        }
        if service.base_url.parse::<axum::http::Uri>().is_err()
            || !service.base_url.starts_with("http")
        {
            errors.push(ValidationError {
                field: format!("{field}.base_url"),
                message: format!("'{}' is not a valid http(s) URL", service.base_url),
            });
        }
        if service.timeout_ms == 0 {
            errors.push(ValidationError {
                field: format!("{field}.timeout_ms"),
                message: "per-call timeout must be positive".into(),
            });
        }
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError {
            field: "circuit_breaker.failure_threshold".into(),
            message: "failure threshold must be at least 1".into(),
        });
    }
    if config.circuit_breaker.reset_timeout_ms == 0 {
        errors.push(ValidationError {
            field: "circuit_breaker.reset_timeout_ms".into(),
            message: "reset timeout must be positive".into(),
        });
    }

    if config.rate_limit.enabled {
        if config.rate_limit.max_requests == 0 {
            errors.push(ValidationError {
                field: "rate_limit.max_requests".into(),
                message: "window cap must be at least 1".into(),
            });
        }
        if config.rate_limit.window_secs == 0 {
            errors.push(ValidationError {
                field: "rate_limit.window_secs".into(),
                message: "window length must be positive".into(),
            });
        }
    }

    if config.auth.enabled && config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError {
            field: "auth.jwt_secret".into(),
            message: "a shared secret is required while auth is enabled".into(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
