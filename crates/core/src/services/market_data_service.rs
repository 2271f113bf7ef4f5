use crate::errors::CoreError;
use crate::models::price::{HistoryCache, PricePoint, Quote};
use crate::models::settings::Settings;
use crate::providers::registry::ProviderRegistry;

/// Fetches price histories and quotes from the registered providers.
///
/// Cache strategy:
/// - **Histories**: kept in a `HistoryCache` for `cache_ttl_secs`. Monthly
///   closes barely move within a session, so a hit skips the network.
/// - **Quotes**: never cached; they're only used for display names.
///
/// The cache is owned by the caller and passed in, the same way the
/// portfolio owns its state and services only borrow it.
pub struct MarketDataService {
    registry: ProviderRegistry,
    period: String,
    interval: String,
    ttl_secs: u64,
}

impl MarketDataService {
    pub fn new(registry: ProviderRegistry, settings: &Settings) -> Self {
        Self {
            registry,
            period: settings.history_period.clone(),
            interval: settings.history_interval.clone(),
            ttl_secs: settings.cache_ttl_secs,
        }
    }

    pub fn provider_names(&self) -> Vec<String> {
        self.registry.names()
    }

    pub fn has_provider(&self) -> bool {
        !self.registry.is_empty()
    }

    /// Price history for `symbol` over the configured period and interval.
    ///
    /// 1. Return the cached history if it is younger than the TTL.
    /// 2. Otherwise try each provider in order; the first usable history
    ///    is cached and returned.
    ///
    /// A provider that answers with no points, or with a non-finite or
    /// non-positive close, counts as failed and the next one is tried.
    pub async fn get_history(
        &self,
        cache: &mut HistoryCache,
        symbol: &str,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let now = chrono::Utc::now();
        if let Some(points) = cache.get(symbol, &self.period, &self.interval, self.ttl_secs, now) {
            tracing::debug!(symbol, points = points.len(), "history cache hit");
            return Ok(points);
        }

        let providers = self.registry.providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider(symbol.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.get_history(symbol, &self.period, &self.interval).await {
                Ok(points) => {
                    if let Err(e) = validate_history(provider.name(), symbol, &points) {
                        tracing::warn!(provider = provider.name(), symbol, error = %e, "rejected history");
                        last_error = Some(e);
                        continue;
                    }
                    tracing::info!(
                        provider = provider.name(),
                        symbol,
                        points = points.len(),
                        "fetched history"
                    );
                    cache.insert(symbol, &self.period, &self.interval, points.clone(), now);
                    return Ok(points);
                }
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, error = %e, "history fetch failed, trying next provider");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(symbol.to_string())))
    }

    /// Latest quote for `symbol`, with the same provider fallback.
    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let providers = self.registry.providers();
        if providers.is_empty() {
            return Err(CoreError::NoProvider(symbol.to_string()));
        }

        let mut last_error = None;
        for provider in &providers {
            match provider.get_quote(symbol).await {
                Ok(quote) => return Ok(quote),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), symbol, error = %e, "quote fetch failed, trying next provider");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| CoreError::NoProvider(symbol.to_string())))
    }
}

fn validate_history(provider: &str, symbol: &str, points: &[PricePoint]) -> Result<(), CoreError> {
    if points.is_empty() {
        return Err(CoreError::Api {
            provider: provider.to_string(),
            message: format!("No valid data returned for {symbol}"),
        });
    }
    if let Some(bad) = points.iter().find(|p| !p.price.is_finite() || p.price <= 0.0) {
        return Err(CoreError::Api {
            provider: provider.to_string(),
            message: format!(
                "Invalid price returned for {symbol} on {}: {} (must be finite and positive)",
                bad.date, bad.price
            ),
        });
    }
    Ok(())
}
