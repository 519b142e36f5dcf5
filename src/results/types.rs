//! Result type definitions

use crate::error::ProviderError;
use crate::providers::Provider;
use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// A single result returned by a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultItem {
    /// Result title
    pub title: String,
    /// Target URL
    pub link: String,
    /// Optional snippet
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Optional date of the underlying document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl ResultItem {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            description: None,
            timestamp: None,
        }
    }

    /// Add a description; blank text is treated as absent
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        let description = description.into();
        self.description = if description.trim().is_empty() {
            None
        } else {
            Some(description)
        };
        self
    }

    /// Add a timestamp; the zero date is treated as absent
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = if is_zero_date(&timestamp) {
            None
        } else {
            Some(timestamp)
        };
        self
    }
}

/// Go-style zero time (`0001-01-01T00:00:00Z`) means "no date"
pub fn is_zero_date(timestamp: &DateTime<Utc>) -> bool {
    timestamp.year() <= 1
}

/// What one live lookup produced
#[derive(Debug, Clone)]
pub enum SearchOutcome {
    Success {
        provider: Arc<Provider>,
        sequence: u64,
        items: Vec<ResultItem>,
        elapsed: Duration,
    },
    Failure {
        provider: Arc<Provider>,
        sequence: u64,
        error: ProviderError,
        elapsed: Duration,
    },
}

impl SearchOutcome {
    pub fn provider(&self) -> &Arc<Provider> {
        match self {
            Self::Success { provider, .. } | Self::Failure { provider, .. } => provider,
        }
    }

    /// Sequence of the query cycle this outcome belongs to
    pub fn sequence(&self) -> u64 {
        match self {
            Self::Success { sequence, .. } | Self::Failure { sequence, .. } => *sequence,
        }
    }

    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Success { elapsed, .. } | Self::Failure { elapsed, .. } => *elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }
}
