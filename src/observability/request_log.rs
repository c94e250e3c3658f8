//! In-memory request log powering `/stats`.
//!
//! # Design Decisions
//! - Bounded by time, not count: the maintenance task evicts entries
//!   older than the configured retention
//! - `evict_older_than` takes an explicit cutoff so tests never wait on
//!   a real clock
//! - Lifetime totals live in an atomic counter and survive eviction

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Instant;

use crate::http::server::AppState;
use crate::observability::metrics;

/// One completed request, appended after the response is written.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
    pub client: String,
}

/// Rolled-up view for the `/stats` endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestStats {
    pub total_requests: u64,
    pub retained_entries: usize,
    pub average_latency_ms: f64,
}

/// Append-mostly log of recent requests.
pub struct RequestLog {
    entries: Mutex<VecDeque<LogEntry>>,
    total: AtomicU64,
}

impl RequestLog {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            total: AtomicU64::new(0),
        }
    }

    pub fn append(&self, entry: LogEntry) {
        self.total.fetch_add(1, Ordering::Relaxed);
        self.lock().push_back(entry);
    }

    /// Drop entries recorded before `cutoff`. Entries are appended in
    /// time order, so eviction stops at the first survivor.
    pub fn evict_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        while entries.front().is_some_and(|e| e.timestamp < cutoff) {
            entries.pop_front();
        }
        before - entries.len()
    }

    pub fn stats(&self) -> RequestStats {
        let entries = self.lock();
        let retained = entries.len();
        let average = if retained == 0 {
            0.0
        } else {
            entries.iter().map(|e| e.duration_ms as f64).sum::<f64>() / retained as f64
        };
        RequestStats {
            total_requests: self.total.load(Ordering::Relaxed),
            retained_entries: retained,
            average_latency_ms: average,
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, VecDeque<LogEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RequestLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware entry: wraps timing around the rest of the chain and
/// records the outcome whatever it was.
pub async fn request_log_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let client = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let duration_ms = started.elapsed().as_millis() as u64;
    metrics::record_request(&method, status, started);
    tracing::info!(
        method = %method,
        path = %path,
        status,
        duration_ms,
        client = %client,
        "request completed"
    );
    state.ctx.request_log.append(LogEntry {
        timestamp: Utc::now(),
        method,
        path,
        status,
        duration_ms,
        client,
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(age_secs: i64, duration_ms: u64) -> LogEntry {
        LogEntry {
            timestamp: Utc::now() - Duration::seconds(age_secs),
            method: "GET".into(),
            path: "/api/cursos".into(),
            status: 200,
            duration_ms,
            client: "10.0.0.1".into(),
        }
    }

    #[test]
    fn eviction_is_pure_over_a_cutoff() {
        let log = RequestLog::new();
        log.append(entry(3_600, 10));
        log.append(entry(1_800, 20));
        log.append(entry(10, 30));

        let evicted = log.evict_older_than(Utc::now() - Duration::seconds(1_900));
        assert_eq!(evicted, 1);

        let stats = log.stats();
        assert_eq!(stats.retained_entries, 2);
        // Lifetime total unaffected by eviction.
        assert_eq!(stats.total_requests, 3);
    }

    #[test]
    fn average_latency_over_retained_entries() {
        let log = RequestLog::new();
        log.append(entry(5, 10));
        log.append(entry(4, 30));

        let stats = log.stats();
        assert!((stats.average_latency_ms - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn empty_log_reports_zero() {
        let stats = RequestLog::new().stats();
        assert_eq!(stats.total_requests, 0);
        assert_eq!(stats.average_latency_ms, 0.0);
    }
}
