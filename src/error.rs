//! Error types for the dispatcher and its collaborators
//!
//! Provider failures never escape a single query cycle: they are carried as
//! [`ProviderError`] values inside a failure outcome. Only configuration
//! problems are fatal, and only at startup.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Invalid or empty provider set. Fatal to startup.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    /// A provider was registered without a name
    #[error("invalid provider name")]
    EmptyName,

    /// A provider's priority is not an integer
    #[error("invalid priority for provider {name}: {value}")]
    InvalidPriority { name: String, value: String },

    /// Discovery yielded zero usable providers
    #[error("no available provider to search")]
    NoProviders,

    /// Discovery itself failed
    #[error("could not retrieve providers: {0}")]
    Discovery(String),
}

/// A single provider call failed.
///
/// This is the normalised `{code, message}` shape every client produces,
/// whatever the transport returned. `code` is 0 when there was no response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderError {
    /// Status code reported by the transport (0 if unknown)
    pub code: u16,
    /// Human readable message
    pub message: String,
}

impl ProviderError {
    pub const UNKNOWN_MESSAGE: &'static str = "unknown error";

    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Client-side deadline exceeded
    pub fn timeout() -> Self {
        Self::new(504, "timeout")
    }

    /// Build from an HTTP error response.
    ///
    /// Message precedence: body `message`, body `error`, the status reason,
    /// then "unknown error".
    pub fn from_response(status: u16, body: &str) -> Self {
        let from_body = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|json| {
                ["message", "error"].iter().find_map(|key| {
                    json.get(key)
                        .and_then(|v| v.as_str())
                        .filter(|s| !s.trim().is_empty())
                        .map(str::to_string)
                })
            });

        let message = from_body
            .or_else(|| {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| Self::UNKNOWN_MESSAGE.to_string());

        Self::new(status, message)
    }

    /// Text shown in a provider's failed section
    pub fn summary(&self) -> &str {
        let message = self.message.trim();
        if message.is_empty() {
            Self::UNKNOWN_MESSAGE
        } else {
            message
        }
    }
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.summary(), self.code)
    }
}

impl std::error::Error for ProviderError {}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Self::timeout();
        }
        let code = err.status().map(|s| s.as_u16()).unwrap_or(0);
        Self::new(code, err.to_string())
    }
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum FerretError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("settings error: {0}")]
    Settings(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid settings file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, FerretError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_messages() {
        assert_eq!(
            ConfigurationError::NoProviders.to_string(),
            "no available provider to search"
        );
        assert_eq!(
            ConfigurationError::Discovery("connection refused (0)".into()).to_string(),
            "could not retrieve providers: connection refused (0)"
        );
    }

    #[test]
    fn test_from_response_prefers_body_message() {
        let err = ProviderError::from_response(500, r#"{"message":"boom","error":"other"}"#);
        assert_eq!(err, ProviderError::new(500, "boom"));

        let err = ProviderError::from_response(400, r#"{"error":"missing keyword"}"#);
        assert_eq!(err.message, "missing keyword");
    }

    #[test]
    fn test_from_response_falls_back_to_reason() {
        let err = ProviderError::from_response(503, "<html>down</html>");
        assert_eq!(err.message, "Service Unavailable");

        let err = ProviderError::from_response(599, "");
        assert_eq!(err.message, "unknown error");
    }

    #[test]
    fn test_summary_defaults() {
        assert_eq!(ProviderError::new(0, "  ").summary(), "unknown error");
        assert_eq!(ProviderError::new(500, "timeout").to_string(), "timeout (500)");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FerretError>();
        assert_send_sync::<ProviderError>();
    }
}
