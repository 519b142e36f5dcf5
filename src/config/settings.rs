//! Settings structures for Ferret configuration

use crate::error::{FerretError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main settings structure matching `ferret.yml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub search: SearchSettings,
    pub outgoing: OutgoingSettings,
    pub github: GithubSettings,
    pub discovery: DiscoveryMode,
    pub providers: Vec<ProviderConfig>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            general: GeneralSettings::default(),
            search: SearchSettings::default(),
            outgoing: OutgoingSettings::default(),
            github: GithubSettings::default(),
            discovery: DiscoveryMode::default(),
            providers: default_providers(),
        }
    }
}

impl Settings {
    /// Load settings from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Settings = serde_yaml::from_str(&content)?;
        Ok(settings)
    }

    /// Merge with environment variables (FERRET_* prefix)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("FERRET_DEBUG") {
            self.general.debug = parse_bool(&val);
        }
        if let Ok(val) = std::env::var("FERRET_SERVER_URL") {
            self.outgoing.server_url = val;
        }
        if let Ok(val) = std::env::var("FERRET_SEARCH_TIMEOUT") {
            if let Some(ms) = parse_duration_ms(&val) {
                self.outgoing.request_timeout_ms = ms;
            }
        }
        if let Ok(val) = std::env::var("FERRET_GITHUB_URL") {
            self.github.url = val.trim_end_matches('/').to_string();
        }
        if let Ok(val) = std::env::var("FERRET_GITHUB_TOKEN") {
            self.github.token = Some(val);
        }
        if let Ok(val) = std::env::var("FERRET_GITHUB_SEARCH_USER") {
            self.github.search_user = Some(val);
        }
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.outgoing.server_url).map_err(|e| {
            FerretError::Settings(format!(
                "invalid server_url {}: {}",
                self.outgoing.server_url, e
            ))
        })?;
        url::Url::parse(&self.github.url).map_err(|e| {
            FerretError::Settings(format!("invalid github url {}: {}", self.github.url, e))
        })?;
        if self.outgoing.page == 0 {
            return Err(FerretError::Settings(
                "page must be greater than 0".to_string(),
            ));
        }
        if self.outgoing.request_timeout_ms == 0 {
            return Err(FerretError::Settings(
                "request_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Get provider config by name
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }
}

/// General settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Enable debug logging
    pub debug: bool,
}

/// Input filtering settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    /// Shortest accepted query, in characters
    pub min_query_length: usize,
    /// Quiet window after an accepted query, in milliseconds (0 disables)
    pub quiet_window_ms: u64,
    /// Key that commits a query from the input field
    pub commit_key: String,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            min_query_length: 3,
            quiet_window_ms: 1000,
            commit_key: "Enter".to_string(),
        }
    }
}

/// Outgoing request settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutgoingSettings {
    /// Base URL of the Ferret search server
    pub server_url: String,
    /// Per-call timeout in milliseconds
    pub request_timeout_ms: u64,
    /// Maximum results requested per provider
    pub result_limit: u32,
    /// Result page requested from providers, starting at 1
    pub page: u32,
    /// User agent sent with every request
    pub user_agent: String,
}

impl Default for OutgoingSettings {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:3030".to_string(),
            request_timeout_ms: 5000,
            result_limit: 10,
            page: 1,
            user_agent: format!("ferret/{}", crate::VERSION),
        }
    }
}

/// Direct GitHub code search settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GithubSettings {
    /// API base URL
    pub url: String,
    /// Personal access token
    pub token: Option<String>,
    /// Restrict searches to this user's repositories
    pub search_user: Option<String>,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            url: "https://api.github.com".to_string(),
            token: None,
            search_user: None,
        }
    }
}

/// Where the initial provider set comes from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryMode {
    /// Use the `providers` list from settings
    #[default]
    Static,
    /// Ask the Ferret server (`GET /providers`)
    Remote,
}

/// Individual provider configuration
///
/// With remote discovery these entries act as overlays on the discovered
/// set, matched by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Provider name (unique identifier)
    pub name: String,
    /// Display title
    pub title: Option<String>,
    /// Priority; kept loosely typed so bad values surface as configuration errors
    pub priority: Option<serde_json::Value>,
    /// Appended to every query sent to this provider
    pub query_suffix: Option<String>,
    /// Whether the provider is disabled
    pub disabled: bool,
}

impl ProviderConfig {
    pub fn new(name: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            priority: Some(serde_json::Value::from(priority)),
            ..Default::default()
        }
    }
}

/// Default provider configurations
fn default_providers() -> Vec<ProviderConfig> {
    vec![ProviderConfig {
        title: Some("Github".to_string()),
        query_suffix: Some(" extension:md".to_string()),
        ..ProviderConfig::new("github", 0)
    }]
}

/// Parse a Go-style duration (`5000ms`, `5s`, `1.5s`) or bare milliseconds
/// Lenient boolean for environment flags: `1`, `true`, `yes` and `on`
pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

pub fn parse_duration_ms(value: &str) -> Option<u64> {
    let value = value.trim();
    let (number, scale) = if let Some(n) = value.strip_suffix("ms") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix('s') {
        (n, 1000.0)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60_000.0)
    } else {
        (value, 1.0)
    };

    let number: f64 = number.trim().parse().ok()?;
    if !number.is_finite() || number <= 0.0 {
        return None;
    }
    Some((number * scale).round() as u64)
}
