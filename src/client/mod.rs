//! Provider clients
//!
//! A [`ProviderClient`] performs the remote lookup for a provider. The
//! dispatcher only sees this trait; transports live in the submodules.

mod github;
mod http;

pub use github::GithubClient;
pub use http::HttpProviderClient;

use crate::error::ProviderError;
use crate::results::ResultItem;
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Performs one lookup for a provider.
///
/// Dropping the returned future abandons the call.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn search(&self, provider: &str, query: &str) -> Result<Vec<ResultItem>, ProviderError>;
}

/// Routes each provider name to a dedicated client, with an optional fallback
#[derive(Clone, Default)]
pub struct ClientRouter {
    routes: HashMap<String, Arc<dyn ProviderClient>>,
    fallback: Option<Arc<dyn ProviderClient>>,
}

impl ClientRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `client` for the provider called `name`
    pub fn with_route(mut self, name: impl Into<String>, client: Arc<dyn ProviderClient>) -> Self {
        self.routes.insert(name.into(), client);
        self
    }

    /// Use `client` for every provider without a route
    pub fn with_fallback(mut self, client: Arc<dyn ProviderClient>) -> Self {
        self.fallback = Some(client);
        self
    }

    pub fn has_route(&self, name: &str) -> bool {
        self.routes.contains_key(name)
    }

    fn client_for(&self, name: &str) -> Option<&Arc<dyn ProviderClient>> {
        self.routes.get(name).or(self.fallback.as_ref())
    }
}

#[async_trait]
impl ProviderClient for ClientRouter {
    async fn search(&self, provider: &str, query: &str) -> Result<Vec<ResultItem>, ProviderError> {
        match self.client_for(provider) {
            Some(client) => client.search(provider, query).await,
            None => Err(ProviderError::new(
                0,
                format!("no client configured for provider {}", provider),
            )),
        }
    }
}

/// Build the shared reqwest client
pub(crate) fn build_http_client(timeout: Duration, user_agent: &str) -> reqwest::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(user_agent)
        .pool_max_idle_per_host(10)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Decode a JSON response body, normalising failures to [`ProviderError`]
pub(crate) async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, ProviderError> {
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        return Err(ProviderError::from_response(status.as_u16(), &text));
    }

    serde_json::from_str(&text)
        .map_err(|e| ProviderError::new(502, format!("invalid response: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(&'static str);

    #[async_trait]
    impl ProviderClient for Fixed {
        async fn search(
            &self,
            provider: &str,
            _query: &str,
        ) -> Result<Vec<ResultItem>, ProviderError> {
            Ok(vec![ResultItem::new(self.0, provider)])
        }
    }

    #[tokio::test]
    async fn test_router_prefers_route_then_fallback() {
        let router = ClientRouter::new()
            .with_route("github", Arc::new(Fixed("direct")))
            .with_fallback(Arc::new(Fixed("server")));

        let items = router.search("github", "q").await.unwrap();
        assert_eq!(items[0].title, "direct");

        let items = router.search("slack", "q").await.unwrap();
        assert_eq!(items[0].title, "server");
        assert_eq!(items[0].link, "slack");
    }

    #[tokio::test]
    async fn test_router_without_route_fails() {
        let router = ClientRouter::new().with_route("github", Arc::new(Fixed("direct")));
        let err = router.search("slack", "q").await.unwrap_err();
        assert_eq!(err.code, 0);
        assert!(err.message.contains("slack"));
        assert!(router.has_route("github"));
    }
}
