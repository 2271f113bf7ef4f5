// ═══════════════════════════════════════════════════════════════════
// Integration Tests — MarketLens end to end with mock data sources
// ═══════════════════════════════════════════════════════════════════

use async_trait::async_trait;
use chrono::{Months, NaiveDate};
use std::io::Cursor;
use std::sync::{Arc, Mutex};

use market_lens_core::errors::CoreError;
use market_lens_core::models::annotation::{AnnotationKind, AnnotationSet};
use market_lens_core::models::analytics::SentimentLabel;
use market_lens_core::models::asset::{AssetType, ReturnStats};
use market_lens_core::models::chart_analysis::{
    ChartAnalysis, ChartAnalysisRequest, ChartImage, SentimentReading, Verdict, VolatilityLevel,
    VolatilityReading,
};
use market_lens_core::models::news::NewsItem;
use market_lens_core::models::price::{PricePoint, Quote};
use market_lens_core::models::projection::{ContributionFrequency, ContributionSchedule};
use market_lens_core::models::settings::Settings;
use market_lens_core::providers::registry::ProviderRegistry;
use market_lens_core::providers::traits::{
    AnnotationSource, ChartAnalyst, MarketDataProvider, NewsSource,
};
use market_lens_core::surface::{DisplayList, DrawCommand};
use market_lens_core::MarketLens;

// ═══════════════════════════════════════════════════════════════════
// Test Helpers — Mock Data Sources
// ═══════════════════════════════════════════════════════════════════

/// Serves 10 years of monthly closes growing 1% a month. Symbols starting
/// with "BAD" fail; quotes fail for "NONAME".
struct MockMarket;

#[async_trait]
impl MarketDataProvider for MockMarket {
    fn name(&self) -> &str {
        "Mock market"
    }

    async fn get_history(
        &self,
        symbol: &str,
        _period: &str,
        _interval: &str,
    ) -> Result<Vec<PricePoint>, CoreError> {
        if symbol.starts_with("BAD") {
            return Err(CoreError::Api {
                provider: "Mock market".into(),
                message: format!("No valid data returned for {symbol}"),
            });
        }
        let start = NaiveDate::from_ymd_opt(2014, 1, 1).unwrap();
        Ok((0..120)
            .map(|i| PricePoint {
                date: start + Months::new(i),
                price: 100.0 * 1.01f64.powi(i as i32),
            })
            .collect())
    }

    async fn get_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        if symbol == "NONAME" {
            return Err(CoreError::Network("timeout".into()));
        }
        Ok(Quote {
            symbol: symbol.to_string(),
            name: format!("{symbol} Corp"),
            price: Some(100.0),
            change_pct: Some(1.0),
        })
    }
}

/// Image length, file name and analysis text of the last request.
type Requests = Arc<Mutex<Option<(usize, String, Option<String>)>>>;

/// Returns canned annotations and remembers what it was sent.
struct MockAnalyst {
    last_request: Requests,
}

#[async_trait]
impl AnnotationSource for MockAnalyst {
    fn name(&self) -> &str {
        "Mock analyst"
    }

    async fn request_annotations(
        &self,
        image: Vec<u8>,
        file_name: &str,
        existing_analysis: Option<&str>,
    ) -> Result<AnnotationSet, CoreError> {
        *self.last_request.lock().unwrap() = Some((
            image.len(),
            file_name.to_string(),
            existing_analysis.map(str::to_string),
        ));
        AnnotationSet::from_json(
            r#"[
                {"type": "support", "coordinates": [10, 50, 90, 50], "label": "Support"},
                {"type": "entry", "coordinates": [25, 60], "label": "Buy"},
                {"type": "fibonacci", "coordinates": [0, 0, 1, 1]}
            ]"#,
        )
    }
}

/// Symbols of every news request made.
type NewsRequests = Arc<Mutex<Vec<Vec<String>>>>;

/// Serves stories with the given sentiments, or fails when there are none.
struct MockNews {
    sentiments: Vec<f64>,
    requests: NewsRequests,
}

#[async_trait]
impl NewsSource for MockNews {
    fn name(&self) -> &str {
        "Mock news"
    }

    async fn fetch_news(&self, symbols: &[String]) -> Result<Vec<NewsItem>, CoreError> {
        self.requests.lock().unwrap().push(symbols.to_vec());
        if self.sentiments.is_empty() {
            return Err(CoreError::Network("news service down".into()));
        }
        Ok(self
            .sentiments
            .iter()
            .map(|&sentiment| NewsItem {
                title: format!("Story at {sentiment}"),
                source: "Wire".into(),
                date: "2025-01-01".into(),
                url: String::new(),
                summary: String::new(),
                sentiment,
            })
            .collect())
    }
}

fn with_news(lens: MarketLens, sentiments: &[f64]) -> (MarketLens, NewsRequests) {
    let requests: NewsRequests = Arc::new(Mutex::new(Vec::new()));
    let news = MockNews {
        sentiments: sentiments.to_vec(),
        requests: requests.clone(),
    };
    (lens.with_news_source(Box::new(news)), requests)
}

/// Reads every chart as bullish and counts the charts it was shown.
struct MockChartAnalyst {
    charts_seen: Arc<Mutex<usize>>,
}

#[async_trait]
impl ChartAnalyst for MockChartAnalyst {
    fn name(&self) -> &str {
        "Mock chart analyst"
    }

    async fn analyse_chart(
        &self,
        request: &ChartAnalysisRequest,
    ) -> Result<ChartAnalysis, CoreError> {
        *self.charts_seen.lock().unwrap() += request.parts().len();
        Ok(ChartAnalysis {
            sentiment: SentimentReading {
                verdict: Verdict::Bullish,
                strength: 70.0,
            },
            volatility: VolatilityReading {
                level: VolatilityLevel::Low,
                strength: 20.0,
            },
            insights: vec!["Higher highs".into()],
            trading_opportunity: String::new(),
        })
    }
}

fn lens() -> (MarketLens, Requests) {
    let mut registry = ProviderRegistry::new();
    registry.register(Box::new(MockMarket));
    let requests: Requests = Arc::new(Mutex::new(None));
    let analyst = MockAnalyst {
        last_request: requests.clone(),
    };
    let lens = MarketLens::with_sources(Settings::default(), registry, Box::new(analyst)).unwrap();
    (lens, requests)
}

fn start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
}

fn png_bytes(w: u32, h: u32) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgba8(image::RgbaImage::new(w, h));
    let mut buf = Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}

fn flat() -> ReturnStats {
    ReturnStats {
        avg_return: 0.0,
        volatility: 0.0,
    }
}

// ═══════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_new_rejects_invalid_settings() {
    let settings = Settings {
        backend_url: "ftp://example.com".into(),
        ..Settings::default()
    };
    assert!(matches!(MarketLens::new(settings), Err(CoreError::ValidationError(_))));
}

#[test]
fn test_new_session_is_empty() {
    let (lens, _) = lens();
    assert!(lens.assets().is_empty());
    assert!(lens.projections().is_empty());
    assert_eq!(lens.allocation_warning(), None);
    assert_eq!(lens.contribution_schedule(), &ContributionSchedule::default());
    assert_eq!(lens.provider_names(), vec!["Mock market".to_string()]);
}

// ═══════════════════════════════════════════════════════════════════
// Assets
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_add_asset_derives_returns_and_name() {
    let (mut lens, _) = lens();
    let id = lens.add_asset("aapl", AssetType::Stock, 60).await.unwrap();

    let asset = &lens.assets()[0];
    assert_eq!(asset.id, id);
    assert_eq!(asset.symbol, "AAPL");
    assert_eq!(asset.name, "AAPL Corp");
    assert!((asset.avg_return - (1.01f64.powi(12) - 1.0)).abs() < 1e-9);
    assert_eq!(
        lens.allocation_warning().as_deref(),
        Some("Total allocation is 60% (should be 100%)")
    );
}

#[tokio::test]
async fn test_add_asset_without_quote_uses_symbol() {
    let (mut lens, _) = lens();
    lens.add_asset("noname", AssetType::Index, 100).await.unwrap();
    assert_eq!(lens.get_asset("NONAME").unwrap().name, "NONAME");
}

#[tokio::test]
async fn test_add_asset_propagates_fetch_failure() {
    let (mut lens, _) = lens();
    let result = lens.add_asset("BADSYM", AssetType::Stock, 50).await;
    assert!(matches!(result, Err(CoreError::Api { .. })));
    assert!(lens.assets().is_empty());
}

#[tokio::test]
async fn test_add_asset_validation() {
    let (mut lens, _) = lens();
    assert!(matches!(
        lens.add_asset("  ", AssetType::Stock, 50).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(matches!(
        lens.add_asset("AAPL", AssetType::Stock, 0).await,
        Err(CoreError::ValidationError(_))
    ));
    assert!(matches!(
        lens.add_asset("AAPL", AssetType::Stock, 101).await,
        Err(CoreError::ValidationError(_))
    ));

    lens.add_asset("AAPL", AssetType::Stock, 50).await.unwrap();
    assert!(matches!(
        lens.add_asset("aapl", AssetType::Stock, 50).await,
        Err(CoreError::ValidationError(_))
    ));
}

#[test]
fn test_remove_asset() {
    let (mut lens, _) = lens();
    let keep = lens
        .add_asset_with_stats("SPY", "S&P 500", AssetType::Index, 70, ReturnStats::DEFAULT)
        .unwrap();
    let drop = lens
        .add_asset_with_stats("TLT", "", AssetType::Bond, 30, ReturnStats::DEFAULT)
        .unwrap();

    let removed = lens.remove_asset(drop).unwrap();
    assert_eq!(removed.symbol, "TLT");
    assert_eq!(lens.assets().len(), 1);
    assert_eq!(lens.assets()[0].id, keep);

    assert!(matches!(lens.remove_asset(drop), Err(CoreError::AssetNotFound(_))));
}

#[test]
fn test_add_asset_with_stats_rejects_non_finite() {
    let (mut lens, _) = lens();
    let stats = ReturnStats {
        avg_return: f64::INFINITY,
        volatility: 0.1,
    };
    assert!(lens
        .add_asset_with_stats("X", "", AssetType::Stock, 10, stats)
        .is_err());
}

// ═══════════════════════════════════════════════════════════════════
// Projections & report
// ═══════════════════════════════════════════════════════════════════

#[test]
fn test_schedule_validation() {
    let (mut lens, _) = lens();
    let negative = ContributionSchedule {
        recurring_amount: -1.0,
        ..ContributionSchedule::default()
    };
    assert!(matches!(
        lens.set_contribution_schedule(negative),
        Err(CoreError::ValidationError(_))
    ));

    let nan = ContributionSchedule {
        initial_investment: f64::NAN,
        ..ContributionSchedule::default()
    };
    assert!(lens.set_contribution_schedule(nan).is_err());
    assert_eq!(lens.contribution_schedule(), &ContributionSchedule::default());
}

#[test]
fn test_project_uses_session_state() {
    let (mut lens, _) = lens();
    assert!(lens.project_from(5, start()).is_empty());

    lens.add_asset_with_stats("CASH", "", AssetType::Currency, 100, flat())
        .unwrap();
    lens.set_contribution_schedule(ContributionSchedule {
        initial_investment: 2_000.0,
        recurring_amount: 1_200.0,
        frequency: ContributionFrequency::Yearly,
        change_year: 1,
        new_recurring_amount: 2_400.0,
    })
    .unwrap();

    let points = lens.project_from(2, start());
    assert_eq!(points.len(), 25);
    assert!((points[12].value - (2_000.0 + 11.0 * 100.0 + 200.0)).abs() < 1e-9);
    assert!((points[24].value - (2_000.0 + 11.0 * 100.0 + 13.0 * 200.0)).abs() < 1e-9);
    assert_eq!(lens.project(1).len(), 13);
}

#[test]
fn test_analyse_then_report() {
    let (mut lens, _) = lens();
    assert!(matches!(lens.analyse_from(start()), Err(CoreError::ValidationError(_))));

    lens.add_asset_with_stats("CASH", "Cash", AssetType::Currency, 100, flat())
        .unwrap();
    assert!(matches!(lens.build_report(0.5), Err(CoreError::ValidationError(_))));

    let projections = lens.analyse_from(start()).unwrap();
    assert_eq!(projections.five_year.len(), 61);
    assert_eq!(projections.ten_year.len(), 121);

    let report = lens.build_report(0.5).unwrap();
    assert_eq!(report.top_performer, "Cash");
    assert_eq!(report.start_value, 10_000.0);
    assert!(report.five_year_value > report.start_value);

    assert!(lens.build_report(1.5).is_err());
}

#[test]
fn test_changing_portfolio_clears_analysis() {
    let (mut lens, _) = lens();
    let id = lens
        .add_asset_with_stats("CASH", "", AssetType::Currency, 100, flat())
        .unwrap();
    lens.analyse_from(start()).unwrap();
    assert!(!lens.projections().is_empty());

    lens.set_contribution_schedule(ContributionSchedule::lump_sum(5_000.0))
        .unwrap();
    assert!(lens.projections().is_empty());

    lens.analyse_from(start()).unwrap();
    lens.remove_asset(id).unwrap();
    assert!(lens.projections().is_empty());
}

// ═══════════════════════════════════════════════════════════════════
// Chart annotations
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_request_annotations_passes_context() {
    let (lens, requests) = lens();
    let set = lens
        .request_annotations(vec![1, 2, 3], "chart.png", Some("Uptrend since March"))
        .await
        .unwrap();
    assert_eq!(set.len(), 2);
    assert_eq!(set.rejected().len(), 1);

    let sent = requests.lock().unwrap().clone().unwrap();
    assert_eq!(sent.0, 3);
    assert_eq!(sent.1, "chart.png");
    assert_eq!(sent.2.as_deref(), Some("Uptrend since March"));
}

#[tokio::test]
async fn test_request_annotations_rejects_empty_image() {
    let (lens, requests) = lens();
    let result = lens.request_annotations(Vec::new(), "chart.png", None).await;
    assert!(matches!(result, Err(CoreError::ValidationError(_))));
    assert!(requests.lock().unwrap().is_none());
}

#[tokio::test]
async fn test_annotate_and_render_chart() {
    let (lens, _) = lens();
    let image = png_bytes(1000, 500);
    let set = lens
        .request_annotations(image.clone(), "chart.png", None)
        .await
        .unwrap();

    let mut session = lens
        .open_render_session(DisplayList::new(), &image, set)
        .unwrap();
    assert_eq!(session.counts()[&AnnotationKind::Support], 1);
    // support line + label, entry dot + arrow + label
    assert_eq!(session.surface().shapes().count(), 5);

    session.toggle(AnnotationKind::Support);
    assert_eq!(session.surface().shapes().count(), 3);
    assert!(matches!(
        session.surface().commands()[0],
        DrawCommand::Clear { width, height } if width == 1000.0 && height == 500.0
    ));
}

#[test]
fn test_render_session_needs_a_readable_image() {
    let (lens, _) = lens();
    let result = lens.open_render_session(DisplayList::new(), b"GIF89a-but-not-really", AnnotationSet::default());
    assert!(matches!(result, Err(CoreError::ImageDecode(_))));
}

// ═══════════════════════════════════════════════════════════════════
// News sentiment
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_portfolio_news_averages_sentiment() {
    let (mut lens, _) = lens();
    lens.add_asset_with_stats("AAPL", "", AssetType::Stock, 60, flat())
        .unwrap();
    lens.add_asset_with_stats("MSFT", "", AssetType::Stock, 40, flat())
        .unwrap();
    let (lens, requests) = with_news(lens, &[0.9, 0.7, 0.8]);

    let digest = lens.portfolio_news().await;
    assert_eq!(digest.items.len(), 3);
    assert!((digest.sentiment - 0.8).abs() < 1e-12);
    assert!(!digest.is_fallback());
    assert_eq!(
        requests.lock().unwrap().as_slice(),
        &[vec!["AAPL".to_string(), "MSFT".to_string()]]
    );
}

#[tokio::test]
async fn test_portfolio_news_falls_back_to_neutral() {
    let (mut lens, _) = lens();
    lens.add_asset_with_stats("AAPL", "", AssetType::Stock, 100, flat())
        .unwrap();
    let (lens, _) = with_news(lens, &[]);

    let digest = lens.portfolio_news().await;
    assert!(digest.items.is_empty());
    assert_eq!(digest.sentiment, 0.5);
    assert_eq!(digest.error.as_deref(), Some("Network error: news service down"));
}

#[tokio::test]
async fn test_empty_portfolio_skips_news_request() {
    let (lens, _) = lens();
    let (lens, requests) = with_news(lens, &[0.9]);

    let digest = lens.portfolio_news().await;
    assert!(digest.items.is_empty());
    assert_eq!(digest.sentiment, 0.5);
    assert!(requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_news_report_uses_news_sentiment() {
    let (mut lens, _) = lens();
    lens.add_asset_with_stats("CASH", "Cash", AssetType::Currency, 100, flat())
        .unwrap();
    let (mut lens, _) = with_news(lens, &[0.9, 0.8]);
    lens.analyse_from(start()).unwrap();

    let report = lens.build_news_report().await.unwrap();
    assert_eq!(report.sentiment, SentimentLabel::VeryPositive);
}

// ═══════════════════════════════════════════════════════════════════
// Chart analysis
// ═══════════════════════════════════════════════════════════════════

#[tokio::test]
async fn test_analyse_chart_through_analyst() {
    let (lens, _) = lens();
    let charts_seen = Arc::new(Mutex::new(0));
    let lens = lens.with_chart_analyst(Box::new(MockChartAnalyst {
        charts_seen: charts_seen.clone(),
    }));

    let request = ChartAnalysisRequest::simple(ChartImage::new(png_bytes(10, 10), "chart.png"));
    let analysis = lens.analyse_chart(&request).await.unwrap();
    assert_eq!(analysis.sentiment.verdict, Verdict::Bullish);
    assert_eq!(analysis.volatility.level.meter_position(), 25.0);
    assert_eq!(*charts_seen.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_analyse_chart_validates_before_sending() {
    let (lens, _) = lens();
    let charts_seen = Arc::new(Mutex::new(0));
    let lens = lens.with_chart_analyst(Box::new(MockChartAnalyst {
        charts_seen: charts_seen.clone(),
    }));

    let result = lens
        .analyse_chart(&ChartAnalysisRequest::advanced(Vec::new()))
        .await;
    assert!(matches!(result, Err(CoreError::ValidationError(_))));
    assert_eq!(*charts_seen.lock().unwrap(), 0);
}
