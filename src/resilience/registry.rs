//! Named circuit breaker instances.
//!
//! # Design Decisions
//! - Breakers are created lazily on first lookup and live for the
//!   process lifetime; the registry is append-only
//! - A re-supplied config for an existing name is ignored: the first
//!   registration wins
//! - All breakers share the registry's observer list

use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;

use super::circuit_breaker::{
    BreakerConfig, BreakerObserver, BreakerSnapshot, BreakerState, CircuitBreaker,
};

/// Breaker counts by state, reported on `/health`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BreakerAggregate {
    pub closed: usize,
    pub open: usize,
    pub half_open: usize,
}

/// Owns every breaker in the process; none exist outside it.
pub struct BreakerRegistry {
    breakers: DashMap<String, Arc<CircuitBreaker>>,
    observers: Vec<Arc<dyn BreakerObserver>>,
}

impl BreakerRegistry {
    pub fn new(observers: Vec<Arc<dyn BreakerObserver>>) -> Self {
        Self {
            breakers: DashMap::new(),
            observers,
        }
    }

    /// Return the breaker registered under `name`, creating it with
    /// `config` on first lookup.
    pub fn get_or_create(&self, name: &str, config: &BreakerConfig) -> Arc<CircuitBreaker> {
        self.breakers
            .entry(name.to_string())
            .or_insert_with(|| {
                tracing::debug!(breaker = name, "creating circuit breaker");
                Arc::new(CircuitBreaker::new(
                    name,
                    config.clone(),
                    self.observers.clone(),
                ))
            })
            .clone()
    }

    pub fn get(&self, name: &str) -> Option<Arc<CircuitBreaker>> {
        self.breakers.get(name).map(|entry| entry.clone())
    }

    pub fn aggregate(&self) -> BreakerAggregate {
        let mut agg = BreakerAggregate::default();
        for entry in self.breakers.iter() {
            match entry.state() {
                BreakerState::Closed => agg.closed += 1,
                BreakerState::Open => agg.open += 1,
                BreakerState::HalfOpen => agg.half_open += 1,
            }
        }
        agg
    }

    pub fn snapshots(&self) -> Vec<BreakerSnapshot> {
        let mut snaps: Vec<_> = self.breakers.iter().map(|e| e.snapshot()).collect();
        snaps.sort_by(|a, b| a.name.cmp(&b.name));
        snaps
    }

    /// Reset one breaker by name. Returns false if it was never created.
    pub fn reset(&self, name: &str) -> bool {
        match self.breakers.get(name) {
            Some(breaker) => {
                breaker.reset();
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) -> usize {
        let mut count = 0;
        for entry in self.breakers.iter() {
            entry.reset();
            count += 1;
        }
        count
    }

    pub fn len(&self) -> usize {
        self.breakers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.breakers.is_empty()
    }
}
