//! Operator-facing endpoints.
//!
//! # Responsibilities
//! - `/health`: liveness plus a breaker-state rollup
//! - `/stats`: request log summary and limiter occupancy
//! - `/circuit-breakers`: per-service snapshots and manual resets
//!
//! These routes sit on the main listener and pass through the same
//! middleware stack as forwarded traffic.

mod handlers;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::server::AppState;

pub fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/stats", get(handlers::stats))
        .route("/circuit-breakers", get(handlers::list_breakers))
        .route("/circuit-breakers/{service}/reset", post(handlers::reset_breaker))
        .route("/circuit-breakers/reset-all", post(handlers::reset_all))
}
