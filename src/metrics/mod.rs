//! Metrics collection module
//!
//! Tracks provider dispatches, cancellations, stale discards, outcomes and
//! response times.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

/// Response times kept per provider
const RESPONSE_WINDOW: usize = 100;

#[derive(Debug, Default, Clone)]
struct ProviderCounters {
    dispatched: u64,
    cancelled: u64,
    discarded: u64,
    successes: u64,
    failures: u64,
    response_times: VecDeque<u64>,
}

/// Session metrics collector
#[derive(Debug, Default)]
pub struct Metrics {
    /// Query cycles dispatched
    pub total_cycles: AtomicU64,
    providers: RwLock<HashMap<String, ProviderCounters>>,
}

impl Metrics {
    /// Create a new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment query cycle count
    pub fn inc_cycle(&self) {
        self.total_cycles.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a lookup started for a provider
    pub fn record_dispatch(&self, provider: &str) {
        self.update(provider, |c| c.dispatched += 1);
    }

    /// Record a live lookup cancelled by a newer query or shutdown
    pub fn record_cancel(&self, provider: &str) {
        self.update(provider, |c| c.cancelled += 1);
    }

    /// Record a late completion from a cancelled lookup
    pub fn record_discard(&self, provider: &str) {
        self.update(provider, |c| c.discarded += 1);
    }

    /// Record provider response time
    pub fn record_response_time(&self, provider: &str, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.update(provider, |c| {
            if c.response_times.len() >= RESPONSE_WINDOW {
                c.response_times.pop_front();
            }
            c.response_times.push_back(ms);
        });
    }

    /// Record provider error
    pub fn record_error(&self, provider: &str) {
        self.update(provider, |c| c.failures += 1);
    }

    /// Record provider success
    pub fn record_success(&self, provider: &str) {
        self.update(provider, |c| c.successes += 1);
    }

    /// Get total query cycles
    pub fn get_total_cycles(&self) -> u64 {
        self.total_cycles.load(Ordering::Relaxed)
    }

    /// Get average response time for a provider in milliseconds
    pub fn get_avg_response_time(&self, provider: &str) -> Option<u64> {
        self.read(provider, |c| Self::average(&c.response_times))
            .flatten()
    }

    /// Get reliability percentage for a provider
    pub fn get_reliability(&self, provider: &str) -> f64 {
        self.read(provider, Self::reliability).unwrap_or(100.0)
    }

    /// Get statistics for one provider
    pub fn get_provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        self.read(provider, Self::stats)
    }

    /// Get statistics for every provider seen, sorted by name
    pub fn get_all_stats(&self) -> Vec<(String, ProviderStats)> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        let mut stats: Vec<_> = providers
            .iter()
            .map(|(name, counters)| (name.clone(), Self::stats(counters)))
            .collect();
        stats.sort_by(|a, b| a.0.cmp(&b.0));
        stats
    }

    fn update(&self, provider: &str, f: impl FnOnce(&mut ProviderCounters)) {
        let mut providers = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        f(providers.entry(provider.to_string()).or_default());
    }

    fn read<T>(&self, provider: &str, f: impl FnOnce(&ProviderCounters) -> T) -> Option<T> {
        let providers = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        providers.get(provider).map(f)
    }

    fn average(times: &VecDeque<u64>) -> Option<u64> {
        if times.is_empty() {
            None
        } else {
            Some(times.iter().sum::<u64>() / times.len() as u64)
        }
    }

    fn reliability(counters: &ProviderCounters) -> f64 {
        let total = counters.successes + counters.failures;
        if total == 0 {
            100.0
        } else {
            (counters.successes as f64 / total as f64) * 100.0
        }
    }

    fn stats(counters: &ProviderCounters) -> ProviderStats {
        ProviderStats {
            dispatched: counters.dispatched,
            cancelled: counters.cancelled,
            discarded: counters.discarded,
            successes: counters.successes,
            failures: counters.failures,
            avg_response_time: Self::average(&counters.response_times),
            reliability: Self::reliability(counters),
        }
    }
}

/// Statistics for a single provider
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderStats {
    pub dispatched: u64,
    pub cancelled: u64,
    pub discarded: u64,
    pub successes: u64,
    pub failures: u64,
    pub avg_response_time: Option<u64>,
    pub reliability: f64,
}
