use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Response,
};
use serde_json::json;

use crate::error::GatewayError;
use crate::http::response::{error_response, json_response, GATEWAY_VERSION};
use crate::http::server::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Response {
    let breakers = state.ctx.breakers.aggregate();
    json_response(
        StatusCode::OK,
        json!({
            "status": "ok",
            "service": "campus-gateway",
            "version": GATEWAY_VERSION,
            "uptimeSecs": state.ctx.uptime_secs(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "circuitBreakers": breakers,
        }),
    )
}

/// GET /stats
pub async fn stats(State(state): State<AppState>) -> Response {
    let stats = state.ctx.request_log.stats();
    json_response(
        StatusCode::OK,
        json!({
            "totalRequests": stats.total_requests,
            "retainedEntries": stats.retained_entries,
            "averageLatencyMs": stats.average_latency_ms,
            "rateLimitedClients": state.ctx.rate_limiter.active_clients(),
            "uptimeSecs": state.ctx.uptime_secs(),
        }),
    )
}

/// GET /circuit-breakers
pub async fn list_breakers(State(state): State<AppState>) -> Response {
    json_response(
        StatusCode::OK,
        json!({
            "circuitBreakers": state.ctx.breakers.snapshots(),
        }),
    )
}

/// POST /circuit-breakers/{service}/reset
pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Response {
    if !state.ctx.breakers.reset(&service) {
        return error_response(&GatewayError::UnknownService(service), None);
    }
    tracing::info!(breaker = %service, "circuit breaker reset by operator");
    json_response(
        StatusCode::OK,
        json!({
            "service": service,
            "state": "CLOSED",
            "message": "circuit breaker reset",
        }),
    )
}

/// POST /circuit-breakers/reset-all
pub async fn reset_all(State(state): State<AppState>) -> Response {
    let count = state.ctx.breakers.reset_all();
    tracing::info!(count, "all circuit breakers reset by operator");
    json_response(
        StatusCode::OK,
        json!({
            "resetCount": count,
            "message": "all circuit breakers reset",
        }),
    )
}
