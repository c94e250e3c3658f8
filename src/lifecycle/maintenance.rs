//! Periodic housekeeping for in-memory state.
//!
//! One task owns all sweeps: request log retention and rate limiter
//! eviction. Runs on a fixed interval until shutdown fires.

use chrono::Duration as ChronoDuration;
use tokio::sync::broadcast;
use tokio::time::{interval, Duration};

use crate::http::server::AppState;

pub struct MaintenanceTask {
    state: AppState,
}

impl MaintenanceTask {
    pub fn new(state: AppState) -> Self {
        Self { state }
    }

    pub async fn run(self, mut shutdown_rx: broadcast::Receiver<()>) {
        let log_config = &self.state.ctx.config.request_log;
        let retention = ChronoDuration::seconds(log_config.retention_secs as i64);
        let mut ticker = interval(Duration::from_secs(log_config.sweep_interval_secs));
        // The first tick fires immediately; skip it so a fresh process
        // does not sweep an empty log.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let cutoff = chrono::Utc::now() - retention;
                    let evicted = self.state.ctx.request_log.evict_older_than(cutoff);
                    self.state.ctx.rate_limiter.evict_expired();
                    if evicted > 0 {
                        tracing::debug!(evicted, "request log sweep");
                    }
                }
                _ = shutdown_rx.recv() => {
                    tracing::debug!("maintenance task stopping");
                    break;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GatewayConfig;
    use crate::http::server::GatewayContext;
    use crate::lifecycle::Shutdown;
    use std::sync::Arc;

    #[tokio::test(start_paused = true)]
    async fn stops_on_shutdown() {
        let state = AppState {
            ctx: Arc::new(GatewayContext::new(GatewayConfig::demo())),
        };
        let shutdown = Shutdown::new();
        let handle = tokio::spawn(MaintenanceTask::new(state).run(shutdown.subscribe()));

        tokio::task::yield_now().await;
        shutdown.trigger();
        handle.await.unwrap();
    }
}
