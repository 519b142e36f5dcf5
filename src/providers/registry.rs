//! Provider registry: the ordered set of providers for a session

use super::provider::{Provider, ProviderDescriptor};
use crate::error::ConfigurationError;
use std::sync::Arc;
use tracing::debug;

/// Registry of the providers searched by a session
///
/// Providers are kept in registration order; [`list`](Self::list) returns
/// them by priority. The dispatcher takes the registry by value, so nothing
/// can register once dispatching has started.
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<Arc<Provider>>,
}

impl ProviderRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider, replacing any provider with the same name.
    ///
    /// A replaced provider keeps its original registration slot.
    pub fn register(&mut self, provider: Provider) -> Result<(), ConfigurationError> {
        if provider.name.trim().is_empty() {
            return Err(ConfigurationError::EmptyName);
        }

        let provider = Arc::new(provider);
        match self.providers.iter().position(|p| p.name == provider.name) {
            Some(slot) => {
                debug!("Replacing provider: {}", provider.name);
                self.providers[slot] = provider;
            }
            None => self.providers.push(provider),
        }
        Ok(())
    }

    /// Validate and register a discovered descriptor
    pub fn register_descriptor(
        &mut self,
        descriptor: ProviderDescriptor,
    ) -> Result<(), ConfigurationError> {
        self.register(Provider::try_from(descriptor)?)
    }

    /// Providers by priority, highest first; ties keep registration order
    pub fn list(&self) -> Vec<Arc<Provider>> {
        let mut list = self.providers.clone();
        // sort_by is stable
        list.sort_by(|a, b| b.priority.cmp(&a.priority));
        list
    }

    /// Get a provider by name
    pub fn get(&self, name: &str) -> Option<&Arc<Provider>> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// Check if a provider exists
    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Provider names in registration order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
