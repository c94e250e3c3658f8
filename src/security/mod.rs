//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (fixed-window per-client cap)
//!     → auth.rs (bearer token, allow-listed public paths)
//!     → Pass to forwarding
//! ```
//!
//! # Design Decisions
//! - Rate limiting runs before auth: unauthenticated floods are cheap
//!   to reject
//! - Fail closed: any verification failure stops the chain
//! - Decoded claims travel in request extensions, never re-verified

pub mod auth;
pub mod rate_limit;

pub use auth::{auth_middleware, Claims};
pub use rate_limit::{rate_limit_middleware, RateLimiter};
