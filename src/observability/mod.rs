//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (tracing events, structured fields)
//!     → metrics.rs (counters, histograms, Prometheus scrape)
//!     → request_log.rs (bounded in-memory log behind /stats)
//!     → breaker_telemetry.rs (breaker transition sink)
//! ```
//!
//! # Design Decisions
//! - Request ID flows through all log lines via the trace layer
//! - Metric updates are cheap; the exporter is opt-in
//! - The request log is the only stateful piece and is time-bounded

pub mod breaker_telemetry;
pub mod logging;
pub mod metrics;
pub mod request_log;

pub use breaker_telemetry::BreakerTelemetry;
pub use request_log::{request_log_middleware, LogEntry, RequestLog, RequestStats};
