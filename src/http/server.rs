//! HTTP server assembly.
//!
//! # Data Flow
//! ```text
//! accept → trace → request id → request log → rate limit → auth
//!        → admin routes | /api/{service}/* forwarder
//! ```
//!
//! # Design Decisions
//! - One shared `GatewayContext` behind an `Arc`; every middleware and
//!   handler reads it through `AppState`
//! - The downstream client is built once and reused for connection
//!   pooling across forwards
//! - Shutdown drains in-flight connections via axum's graceful path

use axum::{
    body::Body,
    extract::connect_info::IntoMakeServiceWithConnectInfo,
    middleware,
    routing::any,
    Router,
};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin;
use crate::config::GatewayConfig;
use crate::http::forwarder::forward_handler;
use crate::lifecycle::MaintenanceTask;
use crate::observability::{request_log_middleware, BreakerTelemetry, RequestLog};
use crate::resilience::BreakerRegistry;
use crate::security::{auth_middleware, rate_limit_middleware, RateLimiter};

/// Pooled client for downstream calls.
pub type HttpClient = Client<HttpConnector, Body>;

/// Everything the gateway holds for its lifetime.
pub struct GatewayContext {
    pub config: GatewayConfig,
    pub breakers: BreakerRegistry,
    pub rate_limiter: RateLimiter,
    pub request_log: RequestLog,
    pub client: HttpClient,
    pub started_at: Instant,
}

impl GatewayContext {
    pub fn new(config: GatewayConfig) -> Self {
        let telemetry: Arc<dyn crate::resilience::BreakerObserver> = Arc::new(BreakerTelemetry);
        let breakers = BreakerRegistry::new(vec![telemetry]);
        let rate_limiter = RateLimiter::new(&config.rate_limit);
        let client = Client::builder(TokioExecutor::new()).build_http();
        Self {
            config,
            breakers,
            rate_limiter,
            request_log: RequestLog::new(),
            client,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_secs(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Cloneable handle shared with every layer and handler.
#[derive(Clone)]
pub struct AppState {
    pub ctx: Arc<GatewayContext>,
}

/// Assemble the full router. Layer order matters: the last layer added
/// runs first, so tracing wraps everything and auth runs innermost.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(admin::admin_routes())
        .route("/api/{service}", any(forward_handler))
        .route("/api/{service}/{*rest}", any(forward_handler))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), rate_limit_middleware))
        .layer(middleware::from_fn_with_state(state.clone(), request_log_middleware))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Owns the router and the run loop.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            state: AppState {
                ctx: Arc::new(GatewayContext::new(config)),
            },
        }
    }

    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Serve until the shutdown channel fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> std::io::Result<()> {
        let maintenance = MaintenanceTask::new(self.state.clone());
        tokio::spawn(maintenance.run(shutdown_rx.resubscribe()));

        let app: IntoMakeServiceWithConnectInfo<Router, SocketAddr> =
            build_router(self.state).into_make_service_with_connect_info::<SocketAddr>();

        tracing::info!(address = %listener.local_addr()?, "gateway listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.recv().await;
                tracing::info!("shutdown signal received, draining connections");
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};
    use tower::util::ServiceExt;

    fn tiny_limit_state() -> AppState {
        let mut config = GatewayConfig::demo();
        config.rate_limit.max_requests = 1;
        config.rate_limit.window_secs = 900;
        AppState {
            ctx: Arc::new(GatewayContext::new(config)),
        }
    }

    #[tokio::test]
    async fn rate_limit_short_circuits_before_routing() {
        let router = build_router(tiny_limit_state());

        let first = router
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-for", "10.0.0.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::OK);

        let second = router
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header("x-forwarded-for", "10.0.0.9")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn protected_route_requires_token() {
        let config = GatewayConfig::demo();
        let router = build_router(AppState {
            ctx: Arc::new(GatewayContext::new(config)),
        });

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/api/cursos/listado")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
