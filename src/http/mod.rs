//! HTTP subsystem: server assembly, request forwarding, and response
//! normalization.
//!
//! # Data Flow
//! ```text
//! client → server.rs (router + middleware stack)
//!        → forwarder.rs (service resolve, breaker + retry wrapped call)
//!        → response.rs (success envelope / deterministic error bodies)
//! ```

pub mod forwarder;
pub mod response;
pub mod server;

pub use server::{AppState, GatewayContext, HttpServer};
