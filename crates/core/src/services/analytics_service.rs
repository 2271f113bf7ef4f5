use crate::errors::CoreError;
use crate::models::analytics::{AssetOutlook, PortfolioReport, Recommendation, SentimentLabel};
use crate::models::asset::{Asset, ReturnStats};
use crate::models::price::PricePoint;
use crate::models::projection::{ContributionSchedule, PortfolioProjections};

/// Fewer points than this and a history is considered too short.
pub const MIN_HISTORY_POINTS: usize = 10;

/// Portfolio-level statistics and the rule-based report.
///
/// Everything here is pure arithmetic over data already in memory; fetching
/// histories is `MarketDataService`'s job.
pub struct AnalyticsService;

impl AnalyticsService {
    pub fn new() -> Self {
        Self
    }

    /// Annualized mean and volatility of period-over-period returns.
    ///
    /// Assumes one point per month. Histories shorter than
    /// `MIN_HISTORY_POINTS` yield `ReturnStats::DEFAULT`. Points with a
    /// non-positive previous price contribute no return.
    pub fn calculate_returns(&self, history: &[PricePoint]) -> ReturnStats {
        if history.len() < MIN_HISTORY_POINTS {
            return ReturnStats::DEFAULT;
        }

        let returns: Vec<f64> = history
            .windows(2)
            .filter(|w| w[0].price > 0.0)
            .map(|w| (w[1].price - w[0].price) / w[0].price)
            .collect();
        if returns.is_empty() {
            return ReturnStats::DEFAULT;
        }

        let n = returns.len() as f64;
        let mean = returns.iter().sum::<f64>() / n;
        let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;

        ReturnStats {
            avg_return: (1.0 + mean).powi(12) - 1.0,
            volatility: variance.sqrt() * 12f64.sqrt(),
        }
    }

    /// Sum of allocations in percent.
    pub fn total_allocation(&self, assets: &[Asset]) -> u32 {
        assets.iter().map(|a| u32::from(a.allocation)).sum()
    }

    /// A user-facing warning when allocations don't add up to 100%.
    /// `None` for an empty portfolio or an exact 100.
    pub fn allocation_warning(&self, assets: &[Asset]) -> Option<String> {
        let total = self.total_allocation(assets);
        if assets.is_empty() || total == 100 {
            None
        } else {
            Some(format!("Total allocation is {total}% (should be 100%)"))
        }
    }

    /// Allocation-weighted average annual return.
    pub fn weighted_return(&self, assets: &[Asset]) -> f64 {
        assets.iter().map(|a| a.avg_return * a.weight()).sum()
    }

    pub fn asset_outlook(&self, asset: &Asset) -> AssetOutlook {
        let growth = |years: i32| ((1.0 + asset.avg_return).powi(years) - 1.0) * 100.0;
        AssetOutlook {
            symbol: asset.symbol.clone(),
            avg_return_pct: asset.avg_return * 100.0,
            volatility_pct: asset.volatility * 100.0,
            five_year_growth_pct: growth(5),
            ten_year_growth_pct: growth(10),
        }
    }

    /// Summarize a finished analysis.
    ///
    /// `sentiment` is a score in `[0, 1]` (0.5 neutral) supplied by the
    /// news layer. Contributions are estimated from the pre-change recurring
    /// amount, so with a change configured the gains figure is approximate.
    pub fn build_report(
        &self,
        assets: &[Asset],
        schedule: &ContributionSchedule,
        projections: &PortfolioProjections,
        sentiment: f64,
    ) -> Result<PortfolioReport, CoreError> {
        if assets.is_empty() {
            return Err(CoreError::ValidationError(
                "Add assets to your portfolio to generate a report".into(),
            ));
        }
        let (Some(first), Some(five), Some(ten)) = (
            projections.five_year.first(),
            projections.five_year.last(),
            projections.ten_year.last(),
        ) else {
            return Err(CoreError::ValidationError(
                "Portfolio has not been analysed yet".into(),
            ));
        };

        let start_value = first.value;
        let growth_pct = |value: f64| {
            if start_value != 0.0 {
                (value - start_value) / start_value * 100.0
            } else {
                0.0
            }
        };

        let monthly = schedule.monthly_contribution();
        let five_year_contributions = schedule.initial_investment + monthly * 12.0 * 5.0;
        let ten_year_contributions = schedule.initial_investment + monthly * 12.0 * 10.0;

        let mut ranked: Vec<&Asset> = assets.iter().collect();
        ranked.sort_by(|a, b| {
            b.avg_return
                .partial_cmp(&a.avg_return)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        // `assets` is non-empty, so both ends exist.
        let top = ranked.first().map(|a| a.name.clone()).unwrap_or_default();
        let bottom = ranked.last().map(|a| a.name.clone()).unwrap_or_default();

        Ok(PortfolioReport {
            asset_count: assets.len(),
            total_allocation: self.total_allocation(assets),
            weighted_return: self.weighted_return(assets),
            start_value,
            five_year_value: five.value,
            ten_year_value: ten.value,
            five_year_growth_pct: growth_pct(five.value),
            ten_year_growth_pct: growth_pct(ten.value),
            five_year_contributions,
            ten_year_contributions,
            five_year_gains: five.value - five_year_contributions,
            ten_year_gains: ten.value - ten_year_contributions,
            top_performer: top,
            bottom_performer: bottom,
            sentiment: SentimentLabel::from_score(sentiment),
            recommendation: Recommendation::from_score(sentiment),
            outlooks: assets.iter().map(|a| self.asset_outlook(a)).collect(),
        })
    }
}

impl Default for AnalyticsService {
    fn default() -> Self {
        Self::new()
    }
}
