//! Client for a Ferret search server

use super::{build_http_client, read_json, ProviderClient};
use crate::config::OutgoingSettings;
use crate::error::{ProviderError, Result};
use crate::providers::{ProviderDescriptor, ProviderDiscovery};
use crate::results::ResultItem;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

/// Talks to `GET {base}/search` and `GET {base}/providers`
#[derive(Clone)]
pub struct HttpProviderClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    limit: u32,
    page: u32,
}

impl HttpProviderClient {
    /// Create a client with default settings
    pub fn new() -> Result<Self> {
        Self::with_settings(&OutgoingSettings::default())
    }

    /// Create a client with custom settings
    pub fn with_settings(settings: &OutgoingSettings) -> Result<Self> {
        let timeout = Duration::from_millis(settings.request_timeout_ms);
        let client = build_http_client(timeout, &settings.user_agent)?;

        Ok(Self {
            client,
            base_url: settings.server_url.trim_end_matches('/').to_string(),
            timeout,
            limit: settings.result_limit,
            page: settings.page,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ProviderClient for HttpProviderClient {
    async fn search(
        &self,
        provider: &str,
        query: &str,
    ) -> std::result::Result<Vec<ResultItem>, ProviderError> {
        let url = format!("{}/search", self.base_url);
        debug!("GET {} provider={} keyword={}", url, provider, query);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("provider", provider.to_string()),
                ("keyword", query.to_string()),
                ("timeout", format!("{}ms", self.timeout.as_millis())),
                ("limit", self.limit.to_string()),
                ("page", self.page.to_string()),
            ])
            .send()
            .await?;

        let body: WireResults = read_json(response).await?;
        Ok(body.into_items())
    }
}

#[async_trait]
impl ProviderDiscovery for HttpProviderClient {
    async fn discover(&self) -> std::result::Result<Vec<ProviderDescriptor>, ProviderError> {
        let url = format!("{}/providers", self.base_url);
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        read_json(response).await
    }
}

/// Search results as served; both `[...]` and `{"results": [...]}` occur
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireResults {
    List(Vec<WireItem>),
    Wrapped {
        #[serde(alias = "Results", default)]
        results: Vec<WireItem>,
    },
}

impl WireResults {
    fn into_items(self) -> Vec<ResultItem> {
        let items = match self {
            Self::List(items) | Self::Wrapped { results: items } => items,
        };
        items.into_iter().map(WireItem::into_item).collect()
    }
}

#[derive(Debug, Deserialize)]
struct WireItem {
    #[serde(alias = "Title", default)]
    title: String,
    #[serde(alias = "Link", default)]
    link: String,
    #[serde(alias = "Description", default)]
    description: Option<String>,
    #[serde(alias = "Date", alias = "timestamp", default)]
    date: Option<DateTime<Utc>>,
}

impl WireItem {
    fn into_item(self) -> ResultItem {
        let mut item = ResultItem::new(self.title, self.link);
        if let Some(description) = self.description {
            item = item.with_description(description);
        }
        if let Some(date) = self.date {
            item = item.with_timestamp(date);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout_ms: u64) -> HttpProviderClient {
        HttpProviderClient::with_settings(&OutgoingSettings {
            server_url: format!("{}/", server.uri()),
            request_timeout_ms: timeout_ms,
            ..Default::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_client_creation() {
        let client = HttpProviderClient::new();
        assert!(client.is_ok());
        assert_eq!(client.unwrap().base_url(), "http://localhost:3030");
    }

    #[tokio::test]
    async fn test_search_request_and_parse() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .and(query_param("provider", "slack"))
            .and(query_param("keyword", "hello world"))
            .and(query_param("timeout", "5000ms"))
            .and(query_param("limit", "10"))
            .and(query_param("page", "1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {
                    "Link": "http://x",
                    "Title": "doc1",
                    "Description": "",
                    "Date": "0001-01-01T00:00:00Z"
                },
                {
                    "link": "http://y",
                    "title": "doc2",
                    "description": "a note",
                    "date": "2016-05-04T10:00:00Z"
                }
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let items = client_for(&server, 5000).search("slack", "hello world").await.unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0], ResultItem::new("doc1", "http://x"));
        assert_eq!(items[1].description.as_deref(), Some("a note"));
        assert!(items[1].timestamp.is_some());
    }

    #[tokio::test]
    async fn test_wrapped_results_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "results": [{"link": "http://x", "title": "doc1"}]
            })))
            .mount(&server)
            .await;

        let items = client_for(&server, 5000).search("slack", "doc").await.unwrap();
        assert_eq!(items, vec![ResultItem::new("doc1", "http://x")]);
    }

    #[tokio::test]
    async fn test_error_response_normalised() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({"message": "boom"})))
            .mount(&server)
            .await;

        let err = client_for(&server, 5000).search("slack", "doc").await.unwrap_err();
        assert_eq!(err, ProviderError::new(500, "boom"));
    }

    #[tokio::test]
    async fn test_slow_server_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/search"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([]))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let err = client_for(&server, 50).search("slack", "doc").await.unwrap_err();
        assert_eq!(err, ProviderError::timeout());
    }

    #[tokio::test]
    async fn test_discover_providers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/providers"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"name": "github", "title": "Github", "priority": 5},
                {"name": "slack"}
            ])))
            .mount(&server)
            .await;

        let descriptors = client_for(&server, 5000).discover().await.unwrap();
        assert_eq!(descriptors.len(), 2);
        assert_eq!(descriptors[0], ProviderDescriptor::new("github", "Github", 5));
        assert_eq!(descriptors[1].title, None);
    }
}
