//! Search provider module
//!
//! Defines providers, the ordered provider registry, and discovery of the
//! initial provider set.

mod loader;
mod provider;
mod registry;

pub use loader::{ProviderDiscovery, ProviderLoader, StaticDiscovery};
pub use provider::{Provider, ProviderDescriptor, QueryTransform};
pub use registry::ProviderRegistry;
