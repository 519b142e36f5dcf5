//! Ferret: a federated search dispatcher
//!
//! Turns a stream of user input into query tokens, fans each token out to
//! every registered provider with latest-wins cancellation, isolates provider
//! failures, and renders sections ordered by provider priority.

pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod providers;
pub mod query;
pub mod render;
pub mod results;
pub mod search;

pub use client::{ClientRouter, ProviderClient};
pub use config::Settings;
pub use error::{ConfigurationError, FerretError, ProviderError};
pub use providers::{Provider, ProviderRegistry};
pub use query::{InputEvent, QueryNormalizer, QueryToken};
pub use render::{RenderInstruction, RenderSink, RenderedView};
pub use results::{ResultAggregator, ResultItem, SearchOutcome};
pub use search::{SearchDispatcher, Session};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
