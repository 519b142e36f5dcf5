//! The event loop tying dispatcher, aggregator and render sink together

use super::dispatcher::{Completion, SearchDispatcher};
use crate::client::ProviderClient;
use crate::config::Settings;
use crate::error::ConfigurationError;
use crate::metrics::Metrics;
use crate::providers::{ProviderDiscovery, ProviderLoader};
use crate::query::QueryToken;
use crate::render::{AlertLevel, RenderInstruction, RenderSink};
use crate::results::{ResultAggregator, SearchOutcome};
use futures::{Stream, StreamExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

/// Startup was refused; the sink already holds the critical alert
pub struct StartError<S> {
    pub error: ConfigurationError,
    pub sink: S,
}

impl<S> fmt::Debug for StartError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StartError")
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}

impl<S> fmt::Display for StartError<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

/// One search session: owns the handle slots, the aggregator and the sink
pub struct Session<S: RenderSink> {
    dispatcher: SearchDispatcher,
    completions: mpsc::UnboundedReceiver<Completion>,
    aggregator: ResultAggregator,
    sink: S,
    metrics: Arc<Metrics>,
}

impl<S: RenderSink> Session<S> {
    /// Discover providers and build the session.
    ///
    /// On a configuration error a single critical alert is sent to the sink
    /// and nothing is dispatched.
    pub async fn start(
        settings: &Settings,
        discovery: &dyn ProviderDiscovery,
        client: Arc<dyn ProviderClient>,
        mut sink: S,
        metrics: Arc<Metrics>,
    ) -> Result<Self, StartError<S>> {
        let registry = match ProviderLoader::discover(discovery, settings).await {
            Ok(registry) => registry,
            Err(error) => {
                error!("Search session not started: {}", error);
                sink.apply(RenderInstruction::Alert {
                    level: AlertLevel::Critical,
                    message: error.to_string(),
                });
                return Err(StartError { error, sink });
            }
        };

        info!("Starting search session with {} providers", registry.len());
        let (dispatcher, completions) = SearchDispatcher::new(registry, client, metrics.clone());

        Ok(Self {
            dispatcher,
            completions,
            aggregator: ResultAggregator::new(),
            sink,
            metrics,
        })
    }

    pub fn dispatcher(&self) -> &SearchDispatcher {
        &self.dispatcher
    }

    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Drive the session until `tokens` ends and every live lookup has
    /// answered, then hand back the sink.
    pub async fn run<T>(self, tokens: T) -> S
    where
        T: Stream<Item = QueryToken>,
    {
        self.run_until(tokens, futures::future::pending()).await
    }

    /// Like [`Session::run`], but cancels every live lookup and returns as
    /// soon as `shutdown` resolves.
    pub async fn run_until<T, F>(mut self, tokens: T, shutdown: F) -> S
    where
        T: Stream<Item = QueryToken>,
        F: Future<Output = ()>,
    {
        futures::pin_mut!(tokens);
        futures::pin_mut!(shutdown);
        let mut input_open = true;

        loop {
            if !input_open && !self.dispatcher.has_pending() {
                break;
            }

            tokio::select! {
                // Newer queries win over older completions
                biased;

                _ = &mut shutdown => {
                    info!("Shutdown requested");
                    self.shutdown();
                    break;
                }
                token = tokens.next(), if input_open => match token {
                    Some(token) => self.on_query_token(token),
                    None => {
                        input_open = false;
                        debug!(
                            "Input closed, draining {} lookups",
                            self.dispatcher.live_handles()
                        );
                    }
                },
                Some(completion) = self.completions.recv() => self.on_completion(completion),
                else => break,
            }
        }

        info!("Search session finished");
        self.sink
    }

    /// Start a new cycle for `token`
    pub fn on_query_token(&mut self, token: QueryToken) {
        let Some(dispatch) = self.dispatcher.on_query_token(token) else {
            return;
        };

        for instruction in self.aggregator.begin_cycle(dispatch.sequence, dispatch.started) {
            self.sink.apply(instruction);
        }
    }

    /// Feed a lookup completion through liveness check and aggregation
    pub fn on_completion(&mut self, completion: Completion) {
        if let Some(outcome) = self.dispatcher.on_completion(completion) {
            self.on_outcome(outcome);
        }
    }

    fn on_outcome(&mut self, outcome: SearchOutcome) {
        let instructions = self.aggregator.on_outcome(outcome);
        if instructions.is_empty() {
            return;
        }

        for instruction in instructions {
            self.sink.apply(instruction);
        }
        if self.aggregator.is_idle() {
            self.sink.cycle_settled();
        }
    }

    /// Cancel every live lookup and settle the aggregator
    pub fn shutdown(&mut self) {
        let was_idle = self.aggregator.is_idle();
        for (_, sequence) in self.dispatcher.cancel_all() {
            self.aggregator.on_cancelled(sequence);
        }
        if !was_idle && self.aggregator.is_idle() {
            self.sink.cycle_settled();
        }
    }
}
