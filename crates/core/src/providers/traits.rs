use async_trait::async_trait;

use crate::errors::CoreError;
use crate::models::annotation::AnnotationSet;
use crate::models::chart_analysis::{ChartAnalysis, ChartAnalysisRequest};
use crate::models::news::NewsItem;
use crate::models::price::{PricePoint, Quote};

/// Trait abstraction for market data sources.
///
/// The backend's Yahoo Finance proxy and the direct Yahoo connector both
/// implement this. If one source stops working, only its implementation
/// changes; the registry falls back to the next one.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait MarketDataProvider: Send + Sync {
    /// Human-readable name of this provider (for logs/errors).
    fn name(&self) -> &str;

    /// Closing prices for `symbol` over `period` at `interval` bar size
    /// (Yahoo syntax, e.g. "10y" / "1mo"). Sorted by date, nulls dropped.
    async fn get_history(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
    ) -> Result<Vec<PricePoint>, CoreError>;

    /// Latest quote for `symbol`.
    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError>;
}

/// Where chart annotations come from: something that looks at a chart
/// image and answers with drawable overlays.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait AnnotationSource: Send + Sync {
    fn name(&self) -> &str;

    /// Ask for annotations on `image`. `existing_analysis` is the text of a
    /// previous analysis of the same chart, passed along as context.
    async fn request_annotations(
        &self,
        image: Vec<u8>,
        file_name: &str,
        existing_analysis: Option<&str>,
    ) -> Result<AnnotationSet, CoreError>;
}

/// Where portfolio news comes from.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait NewsSource: Send + Sync {
    fn name(&self) -> &str;

    /// Recent stories about `symbols`, each with a sentiment in `[0, 1]`.
    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<NewsItem>, CoreError>;
}

/// Something that reads chart images and reports sentiment, volatility
/// and trade ideas.
#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
pub trait ChartAnalyst: Send + Sync {
    fn name(&self) -> &str;

    async fn analyse_chart(&self, request: &ChartAnalysisRequest)
        -> Result<ChartAnalysis, CoreError>;
}
