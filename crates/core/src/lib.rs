pub mod errors;
pub mod models;
pub mod providers;
pub mod services;
pub mod surface;

use chrono::NaiveDate;
use models::{
    analytics::PortfolioReport,
    annotation::AnnotationSet,
    asset::{Asset, AssetType, ReturnStats},
    chart_analysis::{ChartAnalysis, ChartAnalysisRequest},
    news::NewsDigest,
    portfolio::Portfolio,
    price::HistoryCache,
    projection::{ContributionSchedule, PortfolioProjections, ProjectionPoint},
    settings::Settings,
};
use providers::{
    news::BackendNewsClient,
    registry::ProviderRegistry,
    technical_analysis::TechnicalAnalysisClient,
    traits::{AnnotationSource, ChartAnalyst, NewsSource},
};
use services::{
    analytics_service::AnalyticsService, market_data_service::MarketDataService,
    projection_service::ProjectionService, render_session::RenderSession,
};
use surface::Surface;

use errors::CoreError;

/// Horizons shown on the dashboard, in years.
const DASHBOARD_HORIZONS: (u32, u32) = (5, 10);

/// Main entry point for the Market Lens core library.
/// Holds the session's portfolio and all services needed to operate on it.
#[must_use]
pub struct MarketLens {
    portfolio: Portfolio,
    settings: Settings,
    history_cache: HistoryCache,
    market_data: MarketDataService,
    projection_service: ProjectionService,
    analytics_service: AnalyticsService,
    annotation_source: Box<dyn AnnotationSource>,
    news_source: Box<dyn NewsSource>,
    chart_analyst: Box<dyn ChartAnalyst>,
}

impl std::fmt::Debug for MarketLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketLens")
            .field("assets", &self.portfolio.assets.len())
            .field("schedule", &self.portfolio.schedule)
            .field("analysed", &!self.portfolio.projections.is_empty())
            .field("cached_histories", &self.history_cache.len())
            .field("providers", &self.market_data.provider_names())
            .field("annotation_source", &self.annotation_source.name())
            .field("news_source", &self.news_source.name())
            .field("chart_analyst", &self.chart_analyst.name())
            .finish()
    }
}

impl MarketLens {
    /// Create a session talking to the backend named in `settings`.
    pub fn new(settings: Settings) -> Result<Self, CoreError> {
        settings.validate()?;
        let registry = ProviderRegistry::new_with_defaults(&settings);
        let annotation_source = Box::new(TechnicalAnalysisClient::new(
            settings.base_url(),
            settings.request_timeout_secs,
        ));
        Self::with_sources(settings, registry, annotation_source)
    }

    /// Create a session with explicit data sources (custom providers, mocks).
    /// News and chart analysis go to the backend in `settings` until
    /// replaced with [`with_news_source`](Self::with_news_source) or
    /// [`with_chart_analyst`](Self::with_chart_analyst).
    pub fn with_sources(
        settings: Settings,
        registry: ProviderRegistry,
        annotation_source: Box<dyn AnnotationSource>,
    ) -> Result<Self, CoreError> {
        settings.validate()?;
        let news_source = Box::new(BackendNewsClient::new(
            settings.base_url(),
            settings.request_timeout_secs,
        ));
        let chart_analyst = Box::new(TechnicalAnalysisClient::new(
            settings.base_url(),
            settings.request_timeout_secs,
        ));
        Ok(Self {
            portfolio: Portfolio::new(),
            market_data: MarketDataService::new(registry, &settings),
            settings,
            history_cache: HistoryCache::new(),
            projection_service: ProjectionService::new(),
            analytics_service: AnalyticsService::new(),
            annotation_source,
            news_source,
            chart_analyst,
        })
    }

    pub fn with_news_source(mut self, source: Box<dyn NewsSource>) -> Self {
        self.news_source = source;
        self
    }

    pub fn with_chart_analyst(mut self, analyst: Box<dyn ChartAnalyst>) -> Self {
        self.chart_analyst = analyst;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    #[must_use]
    pub fn provider_names(&self) -> Vec<String> {
        self.market_data.provider_names()
    }

    // ── Assets ──────────────────────────────────────────────────────

    /// Look up `symbol`, derive its return statistics from the configured
    /// history and add it with `allocation` percent.
    ///
    /// The display name comes from a quote; if the quote fails the symbol
    /// is used instead, since the name is cosmetic.
    pub async fn add_asset(
        &mut self,
        symbol: &str,
        asset_type: AssetType,
        allocation: u8,
    ) -> Result<uuid::Uuid, CoreError> {
        let symbol = self.check_new_asset(symbol, allocation)?;

        let history = self
            .market_data
            .get_history(&mut self.history_cache, &symbol)
            .await?;
        let stats = self.analytics_service.calculate_returns(&history);

        let name = match self.market_data.get_quote(&symbol).await {
            Ok(quote) => quote.name,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "quote unavailable, using symbol as name");
                symbol.clone()
            }
        };

        Ok(self.push_asset(Asset::new(symbol, name, asset_type, allocation, stats)))
    }

    /// Add an asset with known statistics, without touching the network.
    pub fn add_asset_with_stats(
        &mut self,
        symbol: &str,
        name: &str,
        asset_type: AssetType,
        allocation: u8,
        stats: ReturnStats,
    ) -> Result<uuid::Uuid, CoreError> {
        let symbol = self.check_new_asset(symbol, allocation)?;
        if !stats.avg_return.is_finite() || !stats.volatility.is_finite() {
            return Err(CoreError::ValidationError(format!(
                "Return statistics for {symbol} must be finite"
            )));
        }
        Ok(self.push_asset(Asset::new(symbol, name, asset_type, allocation, stats)))
    }

    /// Remove an asset by its ID and return it.
    pub fn remove_asset(&mut self, asset_id: uuid::Uuid) -> Result<Asset, CoreError> {
        let idx = self
            .portfolio
            .assets
            .iter()
            .position(|a| a.id == asset_id)
            .ok_or_else(|| CoreError::AssetNotFound(asset_id.to_string()))?;
        let asset = self.portfolio.assets.remove(idx);
        self.portfolio.projections = PortfolioProjections::default();
        tracing::info!(symbol = %asset.symbol, "removed asset");
        Ok(asset)
    }

    /// Assets in the order they were added.
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.portfolio.assets
    }

    #[must_use]
    pub fn get_asset(&self, symbol: &str) -> Option<&Asset> {
        self.portfolio.find(symbol)
    }

    /// Warning text when allocations don't add up to 100%. Projections
    /// still run; allocations are used exactly as given.
    #[must_use]
    pub fn allocation_warning(&self) -> Option<String> {
        self.analytics_service.allocation_warning(&self.portfolio.assets)
    }

    fn check_new_asset(&self, symbol: &str, allocation: u8) -> Result<String, CoreError> {
        let symbol = symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CoreError::ValidationError("Symbol must not be empty".into()));
        }
        if !(1..=100).contains(&allocation) {
            return Err(CoreError::ValidationError(format!(
                "Allocation must be between 1 and 100, got {allocation}"
            )));
        }
        if self.portfolio.contains(&symbol) {
            return Err(CoreError::ValidationError(format!(
                "{symbol} is already in the portfolio"
            )));
        }
        Ok(symbol)
    }

    fn push_asset(&mut self, asset: Asset) -> uuid::Uuid {
        let id = asset.id;
        tracing::info!(
            symbol = %asset.symbol,
            allocation = asset.allocation,
            avg_return = asset.avg_return,
            "added asset"
        );
        self.portfolio.assets.push(asset);
        self.portfolio.projections = PortfolioProjections::default();
        if let Some(warning) = self.allocation_warning() {
            tracing::warn!("{warning}");
        }
        id
    }

    // ── Contributions ───────────────────────────────────────────────

    pub fn set_contribution_schedule(
        &mut self,
        schedule: ContributionSchedule,
    ) -> Result<(), CoreError> {
        let amounts = [
            ("initial investment", schedule.initial_investment),
            ("recurring amount", schedule.recurring_amount),
            ("new recurring amount", schedule.new_recurring_amount),
        ];
        for (what, value) in amounts {
            if !value.is_finite() || value < 0.0 {
                return Err(CoreError::ValidationError(format!(
                    "The {what} must be a non-negative number, got {value}"
                )));
            }
        }
        self.portfolio.schedule = schedule;
        self.portfolio.projections = PortfolioProjections::default();
        Ok(())
    }

    #[must_use]
    pub fn contribution_schedule(&self) -> &ContributionSchedule {
        &self.portfolio.schedule
    }

    // ── Projections ─────────────────────────────────────────────────

    /// Project the current portfolio for `horizon_years`, starting today.
    #[must_use]
    pub fn project(&self, horizon_years: u32) -> Vec<ProjectionPoint> {
        self.project_from(horizon_years, chrono::Utc::now().date_naive())
    }

    /// Project the current portfolio for `horizon_years` from `start`.
    #[must_use]
    pub fn project_from(&self, horizon_years: u32, start: NaiveDate) -> Vec<ProjectionPoint> {
        self.projection_service.project(
            &self.portfolio.assets,
            &self.portfolio.schedule,
            horizon_years,
            start,
        )
    }

    /// Run the dashboard projections (5 and 10 years from today) and keep
    /// them for the report.
    pub fn analyse(&mut self) -> Result<&PortfolioProjections, CoreError> {
        self.analyse_from(chrono::Utc::now().date_naive())
    }

    pub fn analyse_from(&mut self, start: NaiveDate) -> Result<&PortfolioProjections, CoreError> {
        if self.portfolio.assets.is_empty() {
            return Err(CoreError::ValidationError(
                "Add assets to your portfolio before analysing".into(),
            ));
        }
        let (short, long) = DASHBOARD_HORIZONS;
        self.portfolio.projections = PortfolioProjections {
            five_year: self.project_from(short, start),
            ten_year: self.project_from(long, start),
        };
        Ok(&self.portfolio.projections)
    }

    /// Projections from the last `analyse`; empty if none ran since the
    /// portfolio last changed.
    #[must_use]
    pub fn projections(&self) -> &PortfolioProjections {
        &self.portfolio.projections
    }

    // ── Analytics ───────────────────────────────────────────────────

    /// Build the portfolio report. `sentiment` is a score in `[0, 1]`.
    pub fn build_report(&self, sentiment: f64) -> Result<PortfolioReport, CoreError> {
        if !(0.0..=1.0).contains(&sentiment) {
            return Err(CoreError::ValidationError(format!(
                "Sentiment score must be between 0 and 1, got {sentiment}"
            )));
        }
        self.analytics_service.build_report(
            &self.portfolio.assets,
            &self.portfolio.schedule,
            &self.portfolio.projections,
            sentiment,
        )
    }

    // ── News ────────────────────────────────────────────────────────

    /// News for the portfolio's symbols with its average sentiment.
    ///
    /// Never fails: an empty portfolio gives an empty neutral digest without
    /// asking, and a failed fetch gives a neutral digest carrying the error.
    pub async fn portfolio_news(&self) -> NewsDigest {
        if self.portfolio.assets.is_empty() {
            return NewsDigest::default();
        }
        let symbols: Vec<String> = self
            .portfolio
            .assets
            .iter()
            .map(|a| a.symbol.clone())
            .collect();

        match self.news_source.fetch_news(&symbols).await {
            Ok(items) => {
                let digest = NewsDigest::from_items(items);
                tracing::info!(
                    stories = digest.items.len(),
                    sentiment = digest.sentiment,
                    "portfolio news received"
                );
                digest
            }
            Err(e) => {
                tracing::warn!(
                    source = self.news_source.name(),
                    error = %e,
                    "portfolio news unavailable, assuming neutral sentiment"
                );
                NewsDigest::unavailable(e.to_string())
            }
        }
    }

    /// Build the report with the sentiment of the portfolio's news.
    pub async fn build_news_report(&self) -> Result<PortfolioReport, CoreError> {
        let digest = self.portfolio_news().await;
        self.build_report(digest.sentiment)
    }

    // ── Chart Analysis ──────────────────────────────────────────────

    /// Have one chart (or one per timeframe) read for sentiment,
    /// volatility and trade ideas.
    pub async fn analyse_chart(
        &self,
        request: &ChartAnalysisRequest,
    ) -> Result<ChartAnalysis, CoreError> {
        request.validate()?;
        let analysis = self.chart_analyst.analyse_chart(request).await?;
        tracing::info!(
            analyst = self.chart_analyst.name(),
            verdict = ?analysis.sentiment.verdict,
            volatility = ?analysis.volatility.level,
            "chart analysis received"
        );
        Ok(analysis)
    }

    // ── Chart Annotations ───────────────────────────────────────────

    /// Send a chart image for annotation. `existing_analysis` is the text
    /// of an earlier analysis of the same chart, if any.
    pub async fn request_annotations(
        &self,
        image: Vec<u8>,
        file_name: &str,
        existing_analysis: Option<&str>,
    ) -> Result<AnnotationSet, CoreError> {
        if image.is_empty() {
            return Err(CoreError::ValidationError("Chart image is empty".into()));
        }
        let set = self
            .annotation_source
            .request_annotations(image, file_name, existing_analysis)
            .await?;
        tracing::info!(
            source = self.annotation_source.name(),
            accepted = set.len(),
            rejected = set.rejected().len(),
            "received chart annotations"
        );
        Ok(set)
    }

    /// Decode `image` and start a render session drawing `annotations`
    /// onto `surface`. Fails without a session if the image can't be read.
    pub fn open_render_session<S: Surface>(
        &self,
        surface: S,
        image: &[u8],
        annotations: AnnotationSet,
    ) -> Result<RenderSession<S>, CoreError> {
        RenderSession::open(surface, image, annotations)
    }
}
