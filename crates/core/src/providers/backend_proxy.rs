use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
#[cfg(not(target_arch = "wasm32"))]
use std::time::Duration;

use crate::errors::CoreError;
use crate::models::price::{PricePoint, Quote};
use super::traits::MarketDataProvider;

const PROVIDER: &str = "Backend proxy";

/// Market data through the app backend's Yahoo Finance proxy.
///
/// - `GET /api/yahoo-finance/chart?symbol=&period=&interval=` returns a
///   Yahoo-shaped chart document (`chart.result[0]`).
/// - `GET /api/yahoo-finance/quote?symbol=` returns `quoteResponse.result[0]`.
///
/// The backend does its own rate limiting and caching; errors come back as
/// `{"error": "..."}` with a 4xx/5xx status.
pub struct BackendProxyProvider {
    client: Client,
    base_url: String,
}

impl BackendProxyProvider {
    pub fn new(base_url: impl Into<String>, timeout_secs: u64) -> Self {
        let builder = Client::builder();
        #[cfg(not(target_arch = "wasm32"))]
        let builder = builder.timeout(Duration::from_secs(timeout_secs));
        #[cfg(target_arch = "wasm32")]
        let _ = timeout_secs;
        Self {
            client: builder.build().unwrap_or_else(|_| Client::new()),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, path: &str, query: &[(&str, &str)]) -> Result<String, CoreError> {
        let url = format!("{}{path}", self.base_url);
        let resp = self.client.get(&url).query(query).send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: backend_error_message(status.as_u16(), &body),
            });
        }
        Ok(body)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl MarketDataProvider for BackendProxyProvider {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn get_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PricePoint>, CoreError> {
        let body = self
            .get_text(
                "/api/yahoo-finance/chart",
                &[("symbol", symbol), ("period", period), ("interval", interval)],
            )
            .await?;
        parse_chart_response(symbol, &body)
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let body = self
            .get_text("/api/yahoo-finance/quote", &[("symbol", symbol)])
            .await?;
        parse_quote_response(symbol, &body)
    }
}

// ── Response shapes ─────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartBody,
}

#[derive(Debug, Deserialize)]
struct ChartBody {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Option<Indicators>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteSeries>,
}

#[derive(Debug, Deserialize)]
struct QuoteSeries {
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResultList,
}

#[derive(Debug, Deserialize)]
struct QuoteResultList {
    #[serde(default)]
    result: Option<Vec<QuoteResult>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteResult {
    #[serde(default)]
    short_name: Option<String>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_change_percent: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

fn invalid(symbol: &str, what: &str) -> CoreError {
    CoreError::Api {
        provider: PROVIDER.into(),
        message: format!("No valid data returned for {symbol}: {what}"),
    }
}

/// Parse a Yahoo-shaped chart document into dated closes.
///
/// Timestamps are unix seconds; bars with a null close are dropped.
/// The result is sorted by date.
pub fn parse_chart_response(symbol: &str, body: &str) -> Result<Vec<PricePoint>, CoreError> {
    let envelope: ChartEnvelope = serde_json::from_str(body)?;
    let result = envelope
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| invalid(symbol, "missing chart result"))?;
    let timestamps = result
        .timestamp
        .ok_or_else(|| invalid(symbol, "missing timestamps"))?;
    let closes = result
        .indicators
        .and_then(|i| i.quote.into_iter().next())
        .and_then(|q| q.close)
        .ok_or_else(|| invalid(symbol, "missing close prices"))?;

    let mut points: Vec<PricePoint> = timestamps
        .iter()
        .zip(closes)
        .filter_map(|(ts, close)| {
            let price = close.filter(|p| p.is_finite())?;
            let date = chrono::DateTime::from_timestamp(*ts, 0)?.date_naive();
            Some(PricePoint { date, price })
        })
        .collect();
    points.sort_by_key(|p| p.date);
    Ok(points)
}

/// Parse a `quoteResponse` document. The name falls back from the short
/// name to the long name to the symbol itself.
pub fn parse_quote_response(symbol: &str, body: &str) -> Result<Quote, CoreError> {
    let envelope: QuoteEnvelope = serde_json::from_str(body)?;
    let q = envelope
        .quote_response
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| invalid(symbol, "no quote data"))?;

    let name = q
        .short_name
        .filter(|n| !n.trim().is_empty())
        .or(q.long_name.filter(|n| !n.trim().is_empty()))
        .unwrap_or_else(|| symbol.to_string());

    Ok(Quote {
        symbol: symbol.to_uppercase(),
        name,
        price: q.regular_market_price,
        change_pct: q.regular_market_change_percent,
    })
}

/// The backend's `{"error": "..."}` message if present, else the status.
pub fn backend_error_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(e) if !e.error.trim().is_empty() => e.error,
        _ => format!("HTTP error! status: {status}"),
    }
}

/// A number the backend may send as a JSON number or a numeric string.
pub(crate) fn lenient_number(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
    .filter(|n| n.is_finite())
}
