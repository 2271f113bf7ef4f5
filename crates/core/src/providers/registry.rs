use crate::models::settings::Settings;

use super::backend_proxy::BackendProxyProvider;
#[cfg(not(target_arch = "wasm32"))]
use super::yahoo_finance::YahooFinanceProvider;
use super::traits::MarketDataProvider;

/// Ordered list of market data providers.
///
/// Services try providers in registration order and fall back to the next
/// on failure. New providers can be added without touching the services.
pub struct ProviderRegistry {
    providers: Vec<Box<dyn MarketDataProvider>>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Create a registry with the default providers for `settings`.
    pub fn new_with_defaults(settings: &Settings) -> Self {
        let mut registry = Self::new();

        // Backend proxy: primary, shares the backend's cache and rate limiting
        registry.register(Box::new(BackendProxyProvider::new(
            settings.base_url(),
            settings.request_timeout_secs,
        )));

        // Yahoo Finance direct: fallback, not available on WASM
        #[cfg(not(target_arch = "wasm32"))]
        {
            if settings.yahoo_fallback {
                match YahooFinanceProvider::new() {
                    Ok(yahoo) => registry.register(Box::new(yahoo)),
                    Err(e) => tracing::warn!(error = %e, "Yahoo Finance fallback unavailable"),
                }
            }
        }

        registry
    }

    /// Register a new provider at the lowest priority.
    pub fn register(&mut self, provider: Box<dyn MarketDataProvider>) {
        self.providers.push(provider);
    }

    /// All providers, ordered by priority.
    pub fn providers(&self) -> Vec<&dyn MarketDataProvider> {
        self.providers.iter().map(|p| p.as_ref()).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}
