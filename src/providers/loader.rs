//! Provider discovery and registry loading

use super::provider::{Provider, ProviderDescriptor};
use super::registry::ProviderRegistry;
use crate::config::{ProviderConfig, Settings};
use crate::error::{ConfigurationError, ProviderError};
use async_trait::async_trait;
use tracing::{info, warn};

/// Source of the initial provider set
#[async_trait]
pub trait ProviderDiscovery: Send + Sync {
    async fn discover(&self) -> Result<Vec<ProviderDescriptor>, ProviderError>;
}

/// Discovery backed by the `providers` list in settings
#[derive(Debug, Clone, Default)]
pub struct StaticDiscovery {
    descriptors: Vec<ProviderDescriptor>,
}

impl StaticDiscovery {
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self { descriptors }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        let descriptors = settings
            .providers
            .iter()
            .map(|config| ProviderDescriptor {
                name: config.name.clone(),
                title: config.title.clone(),
                priority: config.priority.clone(),
            })
            .collect();
        Self { descriptors }
    }
}

#[async_trait]
impl ProviderDiscovery for StaticDiscovery {
    async fn discover(&self) -> Result<Vec<ProviderDescriptor>, ProviderError> {
        Ok(self.descriptors.clone())
    }
}

/// Builds a registry from discovered descriptors plus settings overlays
pub struct ProviderLoader;

impl ProviderLoader {
    /// Run discovery and load the result.
    ///
    /// Fails when discovery fails, when any descriptor is invalid, or when
    /// no provider is left.
    pub async fn discover(
        discovery: &dyn ProviderDiscovery,
        settings: &Settings,
    ) -> Result<ProviderRegistry, ConfigurationError> {
        let descriptors = discovery
            .discover()
            .await
            .map_err(|e| ConfigurationError::Discovery(e.to_string()))?;

        info!("Discovered {} providers", descriptors.len());
        Self::load(descriptors, settings)
    }

    /// Load descriptors, applying per-provider settings by name
    pub fn load(
        descriptors: Vec<ProviderDescriptor>,
        settings: &Settings,
    ) -> Result<ProviderRegistry, ConfigurationError> {
        let mut registry = ProviderRegistry::new();

        for descriptor in descriptors {
            let overlay = settings.get_provider(&descriptor.name);

            if overlay.map(|c| c.disabled).unwrap_or(false) {
                info!("Skipping disabled provider: {}", descriptor.name);
                continue;
            }

            let provider = Self::create_provider(descriptor, overlay)?;
            info!(
                "Loaded provider: {} ({}, priority {})",
                provider.name, provider.title, provider.priority
            );
            registry.register(provider)?;
        }

        if registry.is_empty() {
            warn!("No providers available");
            return Err(ConfigurationError::NoProviders);
        }

        Ok(registry)
    }

    fn create_provider(
        mut descriptor: ProviderDescriptor,
        overlay: Option<&ProviderConfig>,
    ) -> Result<Provider, ConfigurationError> {
        let Some(config) = overlay else {
            return Provider::try_from(descriptor);
        };

        if config.title.is_some() {
            descriptor.title = config.title.clone();
        }
        if config.priority.is_some() {
            descriptor.priority = config.priority.clone();
        }

        let provider = Provider::try_from(descriptor)?;
        Ok(match config.query_suffix {
            Some(ref suffix) if !suffix.is_empty() => provider.with_suffix(suffix.clone()),
            _ => provider,
        })
    }
}
