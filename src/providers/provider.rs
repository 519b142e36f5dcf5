//! Provider definition and descriptor parsing

use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Rewrites a query before it is sent to one provider
pub type QueryTransform = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// A search provider as known to the dispatcher
#[derive(Clone)]
pub struct Provider {
    /// Unique identifier, passed to the client
    pub name: String,
    /// Display title for the provider's section
    pub title: String,
    /// Higher is more prominent
    pub priority: i64,
    transform: Option<QueryTransform>,
}

impl Provider {
    /// Create a provider. An empty title falls back to the name.
    pub fn new(
        name: impl Into<String>,
        title: impl Into<String>,
        priority: i64,
    ) -> Result<Self, ConfigurationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ConfigurationError::EmptyName);
        }

        let title = title.into();
        let title = if title.trim().is_empty() {
            name.clone()
        } else {
            title
        };

        Ok(Self {
            name,
            title,
            priority,
            transform: None,
        })
    }

    /// Attach a query transform
    pub fn with_transform<F>(mut self, transform: F) -> Self
    where
        F: Fn(&str) -> String + Send + Sync + 'static,
    {
        self.transform = Some(Arc::new(transform));
        self
    }

    /// Attach a transform that appends `suffix` to every query
    pub fn with_suffix(self, suffix: impl Into<String>) -> Self {
        let suffix = suffix.into();
        self.with_transform(move |query| format!("{}{}", query, suffix))
    }

    /// Apply the query transform (identity if none)
    pub fn transform(&self, query: &str) -> String {
        match self.transform {
            Some(ref f) => f(query),
            None => query.to_string(),
        }
    }

    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }
}

impl fmt::Debug for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name)
            .field("title", &self.title)
            .field("priority", &self.priority)
            .field("transform", &self.transform.is_some())
            .finish()
    }
}

/// Provider entry as yielded by discovery
///
/// `priority` stays loosely typed until conversion so that malformed values
/// are reported instead of failing the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub priority: Option<serde_json::Value>,
}

impl ProviderDescriptor {
    pub fn new(name: impl Into<String>, title: impl Into<String>, priority: i64) -> Self {
        Self {
            name: name.into(),
            title: Some(title.into()),
            priority: Some(serde_json::Value::from(priority)),
        }
    }
}

impl TryFrom<ProviderDescriptor> for Provider {
    type Error = ConfigurationError;

    fn try_from(descriptor: ProviderDescriptor) -> Result<Self, Self::Error> {
        let priority = parse_priority(&descriptor.name, descriptor.priority.as_ref())?;
        Provider::new(
            descriptor.name,
            descriptor.title.unwrap_or_default(),
            priority,
        )
    }
}

/// Absent or null is 0; integral numbers pass; anything else is rejected
fn parse_priority(
    name: &str,
    value: Option<&serde_json::Value>,
) -> Result<i64, ConfigurationError> {
    let value = match value {
        None | Some(serde_json::Value::Null) => return Ok(0),
        Some(v) => v,
    };

    let parsed = value.as_i64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| f as i64)
    });

    parsed.ok_or_else(|| ConfigurationError::InvalidPriority {
        name: name.to_string(),
        value: value.to_string(),
    })
}
