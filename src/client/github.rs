//! GitHub code search client
//!
//! Uses GitHub's official API to search for code, with text-match fragments
//! as the result description.

use super::{build_http_client, read_json, ProviderClient};
use crate::config::{GithubSettings, OutgoingSettings};
use crate::error::{ProviderError, Result};
use crate::results::ResultItem;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;
use url::form_urlencoded;

const ACCEPT_TEXT_MATCH: &str = "application/vnd.github.v3.text-match+json";
const MAX_DESCRIPTION: usize = 255;

/// Direct client for `GET {github}/search/code`
#[derive(Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    token: Option<String>,
    search_user: Option<String>,
    page: u32,
    per_page: u32,
}

impl GithubClient {
    pub fn new(github: &GithubSettings, outgoing: &OutgoingSettings) -> Result<Self> {
        let timeout = Duration::from_millis(outgoing.request_timeout_ms);
        let client = build_http_client(timeout, &outgoing.user_agent)?;

        Ok(Self {
            client,
            api_url: github.url.trim_end_matches('/').to_string(),
            token: github.token.clone().filter(|t| !t.is_empty()),
            search_user: github.search_user.clone().filter(|u| !u.is_empty()),
            page: outgoing.page.max(1),
            per_page: outgoing.result_limit,
        })
    }

    /// Build the code search URL.
    ///
    /// The user qualifier is appended after encoding so its `+` survives.
    pub fn search_url(&self, query: &str) -> String {
        let mut url = format!(
            "{}/search/code?page={}&per_page={}&q={}",
            self.api_url,
            self.page,
            self.per_page,
            escape(query)
        );
        if let Some(ref user) = self.search_user {
            url.push_str("+user:");
            url.push_str(&escape(user));
        }
        url
    }
}

#[async_trait]
impl ProviderClient for GithubClient {
    async fn search(
        &self,
        _provider: &str,
        query: &str,
    ) -> std::result::Result<Vec<ResultItem>, ProviderError> {
        let url = self.search_url(query);
        debug!("GET {}", url);

        let mut request = self.client.get(&url).header("Accept", ACCEPT_TEXT_MATCH);
        if let Some(ref token) = self.token {
            request = request.header("Authorization", format!("token {}", token));
        }

        let response = request.send().await?;
        let body: CodeSearch = read_json(response).await?;

        Ok(body.items.into_iter().map(CodeItem::into_item).collect())
    }
}

fn escape(text: &str) -> String {
    form_urlencoded::byte_serialize(text.as_bytes()).collect()
}

#[derive(Debug, Deserialize)]
struct CodeSearch {
    #[serde(default)]
    items: Vec<CodeItem>,
}

#[derive(Debug, Deserialize)]
struct CodeItem {
    #[serde(default)]
    path: String,
    #[serde(default)]
    html_url: String,
    #[serde(default)]
    repository: Repository,
    #[serde(default)]
    text_matches: Vec<TextMatch>,
}

#[derive(Debug, Default, Deserialize)]
struct Repository {
    #[serde(default)]
    full_name: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TextMatch {
    #[serde(default)]
    fragment: String,
}

impl CodeItem {
    fn into_item(self) -> ResultItem {
        let title = format!(
            "{}/{}",
            self.repository.full_name,
            self.path.trim_start_matches('/')
        );
        let description = if self.text_matches.is_empty() {
            self.repository.description.unwrap_or_default()
        } else {
            self.text_matches
                .iter()
                .map(|m| m.fragment.as_str())
                .collect::<Vec<_>>()
                .join("...")
        };

        ResultItem::new(title, self.html_url).with_description(truncate(description.trim()))
    }
}

/// Limit to 255 characters, marking the cut with `...`
fn truncate(text: &str) -> String {
    if text.chars().count() <= MAX_DESCRIPTION {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(MAX_DESCRIPTION - 3).collect();
    cut.push_str("...");
    cut
}
