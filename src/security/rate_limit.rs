//! Fixed-window rate limiting per client.
//!
//! # Design Decisions
//! - One counter per client key (x-forwarded-for, then socket address)
//! - The window rolls forward on first request past its reset time, so
//!   a throttled client recovers without operator action
//! - Rejections carry `retryAfter` seconds until the window resets

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use std::net::SocketAddr;
use tokio::time::{Duration, Instant};

use crate::config::RateLimitConfig;
use crate::error::GatewayError;
use crate::http::response::error_response;
use crate::http::server::AppState;
use crate::observability::metrics;

struct WindowEntry {
    count: u32,
    window_reset: Instant,
}

/// Process-wide fixed-window limiter.
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
    enabled: bool,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            enabled: config.enabled,
            max_requests: config.max_requests,
            window: Duration::from_secs(config.window_secs),
        }
    }

    /// Count one request for `key`. On exceed, returns the seconds until
    /// the client's window resets (at least 1).
    pub fn check(&self, key: &str) -> Result<(), u64> {
        if !self.enabled {
            return Ok(());
        }

        let now = Instant::now();
        let mut entry = self.entries.entry(key.to_string()).or_insert(WindowEntry {
            count: 0,
            window_reset: now + self.window,
        });

        if now > entry.window_reset {
            entry.count = 0;
            entry.window_reset = now + self.window;
        }

        entry.count += 1;
        if entry.count > self.max_requests {
            let retry_after = entry
                .window_reset
                .saturating_duration_since(now)
                .as_secs()
                .max(1);
            return Err(retry_after);
        }
        Ok(())
    }

    /// Clients with a live window, reported on `/stats`.
    pub fn active_clients(&self) -> usize {
        let now = Instant::now();
        self.entries
            .iter()
            .filter(|entry| entry.window_reset >= now)
            .count()
    }

    /// Drop entries whose window has fully elapsed.
    pub fn evict_expired(&self) {
        let now = Instant::now();
        self.entries.retain(|_, entry| entry.window_reset >= now);
    }
}

/// Middleware entry: reject over-limit clients before auth and routing.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&request);

    match state.ctx.rate_limiter.check(&key) {
        Ok(()) => next.run(request).await,
        Err(retry_after_secs) => {
            tracing::warn!(client = %key, retry_after_secs, "rate limit exceeded");
            metrics::record_rate_limited();
            error_response(
                &GatewayError::RateLimitExceeded { retry_after_secs },
                None,
            )
        }
    }
}

fn client_key(request: &Request<Body>) -> String {
    if let Some(forwarded) = request
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
    {
        return forwarded.trim().to_string();
    }
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max: u32, window_secs: u64) -> RateLimiter {
        RateLimiter::new(&RateLimitConfig {
            enabled: true,
            max_requests: max,
            window_secs,
        })
    }

    #[tokio::test(start_paused = true)]
    async fn caps_at_window_limit() {
        let limiter = limiter(100, 900);

        for _ in 0..100 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
        let retry_after = limiter.check("10.0.0.1").unwrap_err();
        assert!(retry_after > 0);

        // Another client is unaffected.
        assert!(limiter.check("10.0.0.2").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn window_rolls_forward() {
        let limiter = limiter(2, 900);

        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_ok());
        assert!(limiter.check("10.0.0.1").is_err());

        tokio::time::advance(Duration::from_secs(901)).await;
        assert!(limiter.check("10.0.0.1").is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn eviction_drops_expired_windows() {
        let limiter = limiter(10, 60);
        limiter.check("10.0.0.1").unwrap();
        limiter.check("10.0.0.2").unwrap();
        assert_eq!(limiter.active_clients(), 2);

        tokio::time::advance(Duration::from_secs(61)).await;
        limiter.evict_expired();
        assert_eq!(limiter.active_clients(), 0);
    }

    #[tokio::test]
    async fn disabled_limiter_allows_everything() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            max_requests: 1,
            window_secs: 60,
        });
        for _ in 0..50 {
            assert!(limiter.check("10.0.0.1").is_ok());
        }
    }
}
