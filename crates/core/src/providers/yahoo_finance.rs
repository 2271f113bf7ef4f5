use async_trait::async_trait;
use chrono::NaiveDate;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Yahoo Finance";

/// Direct Yahoo Finance access, used when the backend proxy is unavailable.
///
/// - **Free**: No API key required.
/// - **Coverage**: Global equities, ETFs, indices, futures, FX and crypto pairs.
///
/// Uses the `yahoo_finance_api` crate. It only exposes prices, so quotes
/// carry the symbol as their name and derive the day change from the last
/// two daily closes.
///
/// **Note**: Not WASM-compatible (uses native reqwest/tokio connectors).
pub struct YahooFinanceProvider {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceProvider {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Convert a unix timestamp (seconds) to `chrono::NaiveDate`.
    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl MarketDataProvider for YahooFinanceProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let resp = self
            .connector
            .get_quote_range(symbol, interval, period)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch {period} history for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        let mut points: Vec<PricePoint> = quotes
            .iter()
            .filter(|q| q.close.is_finite())
            .filter_map(|q| {
                Some(PricePoint {
                    date: Self::timestamp_to_naive_date(i64::try_from(q.timestamp).ok()?)?,
                    price: q.close,
                })
            })
            .collect();
        points.sort_by_key(|p| p.date);
        Ok(points)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let resp = self
            .connector
            .get_quote_range(symbol, "1d", "5d")
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch latest quote for {symbol}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No quote data for {symbol}: {e}"),
        })?;

        let closes: Vec<f64> = quotes
            .iter()
            .map(|q| q.close)
            .filter(|c| c.is_finite())
            .collect();
        let price = closes.last().copied();
        let change_pct = match closes.as_slice() {
            [.., prev, last] if *prev > 0.0 => Some((last - prev) / prev * 100.0),
            _ => None,
        };

        Ok(Quote {
            symbol: symbol.to_uppercase(),
            name: symbol.to_uppercase(),
            price,
            change_pct,
        })
    }
}
