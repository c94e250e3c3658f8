//! Campus Gateway: single HTTP entry point for the campus enrollment
//! and payments services.
//!
//! # Architecture
//! ```text
//!                   ┌──────────────────────────────┐
//!   client ───────▶ │ http::server                 │
//!                   │  trace → request id → log    │
//!                   │  → rate limit → auth         │
//!                   └──────────┬───────────────────┘
//!                              │
//!              ┌───────────────┴───────────────┐
//!              ▼                               ▼
//!      admin (/health, /stats,         http::forwarder
//!       /circuit-breakers)              breaker ▷ retry ▷ call
//!                                              │
//!                                              ▼
//!                                   usuarios / cursos / pagos
//! ```
//!
//! # Subsystems
//! - [`config`]: TOML schema, defaults, validation
//! - [`resilience`]: circuit breakers, registry, retry with backoff
//! - [`security`]: bearer-token auth and rate limiting
//! - [`http`]: server assembly, forwarding, response normalization
//! - [`admin`]: operator endpoints
//! - [`observability`]: tracing, metrics, request log
//! - [`lifecycle`]: shutdown fan-out and maintenance sweeps

pub mod admin;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod security;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
