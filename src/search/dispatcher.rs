//! Latest-wins fan-out of query tokens to every provider

use super::handle::SearchHandle;
use crate::client::ProviderClient;
use crate::error::ProviderError;
use crate::metrics::Metrics;
use crate::providers::{Provider, ProviderRegistry};
use crate::query::QueryToken;
use crate::results::{ResultItem, SearchOutcome};
use futures::FutureExt;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

const PANICKED: &str = "provider panicked";

/// Message sent back by a lookup task when the client call returns
#[derive(Debug)]
pub struct Completion {
    pub provider: String,
    pub sequence: u64,
    pub elapsed: Duration,
    pub result: Result<Vec<ResultItem>, ProviderError>,
}

/// A newly started query cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub sequence: u64,
    /// Lookups started, one per provider
    pub started: usize,
    /// Live handles superseded by this cycle
    pub cancelled: usize,
}

/// Starts one lookup per provider for each query token.
///
/// Holds at most one live handle per provider. Lookup tasks report back on
/// the channel returned by [`SearchDispatcher::new`]; their completions must
/// be fed to [`SearchDispatcher::on_completion`] by the owning loop.
pub struct SearchDispatcher {
    /// Registry snapshot, highest priority first
    providers: Vec<Arc<Provider>>,
    client: Arc<dyn ProviderClient>,
    handles: HashMap<String, SearchHandle>,
    completions: mpsc::UnboundedSender<Completion>,
    metrics: Arc<Metrics>,
    last_sequence: Option<u64>,
}

impl SearchDispatcher {
    /// Create a dispatcher over a frozen registry
    pub fn new(
        registry: ProviderRegistry,
        client: Arc<dyn ProviderClient>,
        metrics: Arc<Metrics>,
    ) -> (Self, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let providers = registry.list();
        info!("Dispatcher ready with {} providers", providers.len());

        let dispatcher = Self {
            providers,
            client,
            handles: HashMap::new(),
            completions: tx,
            metrics,
            last_sequence: None,
        };
        (dispatcher, rx)
    }

    pub fn providers(&self) -> &[Arc<Provider>] {
        &self.providers
    }

    /// Handle slot for a provider, live or not
    pub fn handle(&self, provider: &str) -> Option<&SearchHandle> {
        self.handles.get(provider)
    }

    /// Number of live handles
    pub fn live_handles(&self) -> usize {
        self.handles.values().filter(|h| h.is_live()).count()
    }

    pub fn has_pending(&self) -> bool {
        self.handles.values().any(SearchHandle::is_live)
    }

    /// Start a cycle for `token`, cancelling every provider's previous lookup.
    ///
    /// Tokens that do not advance the sequence are ignored.
    pub fn on_query_token(&mut self, token: QueryToken) -> Option<Dispatch> {
        if let Some(last) = self.last_sequence {
            if token.sequence <= last {
                warn!(
                    "Ignoring query token {} (last dispatched {})",
                    token.sequence, last
                );
                return None;
            }
        }
        self.last_sequence = Some(token.sequence);
        self.metrics.inc_cycle();

        info!(
            "Dispatching '{}' (#{}) to {} providers",
            token.text,
            token.sequence,
            self.providers.len()
        );

        let mut cancelled = 0;
        for provider in self.providers.clone() {
            // Cancel before replacing the slot
            if let Some(previous) = self.handles.get_mut(&provider.name) {
                if previous.cancel() {
                    debug!(
                        "Cancelled {} lookup #{}",
                        provider.name,
                        previous.sequence()
                    );
                    self.metrics.record_cancel(&provider.name);
                    cancelled += 1;
                }
            }

            let handle = self.spawn_lookup(provider.clone(), &token);
            self.handles.insert(provider.name.clone(), handle);
        }

        Some(Dispatch {
            sequence: token.sequence,
            started: self.providers.len(),
            cancelled,
        })
    }

    fn spawn_lookup(&self, provider: Arc<Provider>, token: &QueryToken) -> SearchHandle {
        let handle = SearchHandle::new(provider.clone(), token.sequence);
        let cancel = handle.token();
        let client = self.client.clone();
        let tx = self.completions.clone();
        let name = provider.name.clone();
        let query = provider.transform(&token.text);
        let sequence = token.sequence;

        debug!("Searching {} for '{}' (#{})", name, query, sequence);
        self.metrics.record_dispatch(&name);

        tokio::spawn(async move {
            let start = Instant::now();
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    trace!("Lookup {} #{} abandoned", name, sequence);
                    return;
                }
                // A panicking client still answers, so its slot can settle
                result = AssertUnwindSafe(client.search(&name, &query)).catch_unwind() => {
                    result.unwrap_or_else(|_| {
                        warn!("Lookup {} #{} panicked", name, sequence);
                        Err(ProviderError::new(0, PANICKED))
                    })
                }
            };

            let completion = Completion {
                provider: name,
                sequence,
                elapsed: start.elapsed(),
                result,
            };
            if tx.send(completion).is_err() {
                trace!("Completion dropped, dispatcher is gone");
            }
        });

        handle
    }

    /// Turn a completion into an outcome if its handle is still live
    pub fn on_completion(&mut self, completion: Completion) -> Option<SearchOutcome> {
        let Some(handle) = self.handles.get_mut(&completion.provider) else {
            trace!("Discarding completion for unknown provider {}", completion.provider);
            return None;
        };

        if handle.sequence() != completion.sequence || !handle.complete() {
            trace!(
                "Discarding stale completion {} #{}",
                completion.provider,
                completion.sequence
            );
            self.metrics.record_discard(&completion.provider);
            return None;
        }

        let provider = handle.provider().clone();
        let Completion {
            sequence,
            elapsed,
            result,
            ..
        } = completion;
        self.metrics.record_response_time(&provider.name, elapsed);

        Some(match result {
            Ok(items) => {
                debug!(
                    "Provider {} returned {} results in {:?}",
                    provider.name,
                    items.len(),
                    elapsed
                );
                self.metrics.record_success(&provider.name);
                SearchOutcome::Success {
                    provider,
                    sequence,
                    items,
                    elapsed,
                }
            }
            Err(error) => {
                warn!("Provider {} failed: {}", provider.name, error);
                self.metrics.record_error(&provider.name);
                SearchOutcome::Failure {
                    provider,
                    sequence,
                    error,
                    elapsed,
                }
            }
        })
    }

    /// Cancel every live handle. Returns the (provider, sequence) pairs cancelled.
    pub fn cancel_all(&mut self) -> Vec<(String, u64)> {
        let mut cancelled = Vec::new();
        for (name, handle) in self.handles.iter_mut() {
            if handle.cancel() {
                self.metrics.record_cancel(name);
                cancelled.push((name.clone(), handle.sequence()));
            }
        }
        if !cancelled.is_empty() {
            info!("Cancelled {} live lookups", cancelled.len());
        }
        cancelled
    }
}
