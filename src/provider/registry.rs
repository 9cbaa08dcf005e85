//! Provider registry.
//!
//! # Responsibilities
//! - Build providers from configuration
//! - Resolve providers by name
//! - Degrade unknown names to [`UnavailableProvider`]

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::config::schema::ProviderKind;
use crate::provider::http::HttpProvider;
use crate::provider::{Provider, UnavailableProvider};

/// Name-indexed set of providers.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from provider definitions.
    ///
    /// Definitions that fail to build are skipped with an error log; their
    /// names later resolve to an unavailable provider.
    pub fn from_config(configs: &[ProviderConfig]) -> Self {
        let mut registry = Self::new();
        for config in configs {
            match config.kind {
                ProviderKind::Http => match HttpProvider::new(config) {
                    Ok(provider) => registry.register(Arc::new(provider)),
                    Err(e) => {
                        tracing::error!(provider = %config.name, error = %e, "Failed to build provider");
                    }
                },
            }
        }
        registry
    }

    /// Register a provider under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        let name = provider.name().to_string();
        if self.providers.insert(name.clone(), provider).is_some() {
            tracing::warn!(provider = %name, "Replaced existing provider registration");
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(name).cloned()
    }

    /// Resolve a name, falling back to a provider that always fails.
    pub fn resolve(&self, name: &str) -> Arc<dyn Provider> {
        match self.get(name) {
            Some(provider) => provider,
            None => {
                tracing::debug!(provider = %name, "Unknown provider; treating as permanently unhealthy");
                Arc::new(UnavailableProvider::new(name))
            }
        }
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.providers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn http_config(name: &str, endpoint: &str) -> ProviderConfig {
        ProviderConfig {
            name: name.to_string(),
            kind: ProviderKind::Http,
            endpoint: endpoint.to_string(),
            health_path: "/health".to_string(),
            timeout_ms: 1_000,
            api_key: None,
        }
    }

    #[test]
    fn test_from_config_skips_invalid() {
        let registry = ProviderRegistry::from_config(&[
            http_config("good", "http://127.0.0.1:9000/v1"),
            http_config("bad", "::not a url::"),
        ]);
        assert_eq!(registry.names(), vec!["good"]);
    }

    #[tokio::test]
    async fn test_resolve_unknown_degrades() {
        let registry = ProviderRegistry::new();
        let provider = registry.resolve("missing");
        assert_eq!(provider.name(), "missing");
        assert!(provider.health_check().await.is_err());
    }
}
