use serde::{Deserialize, Serialize};

/// Compounded growth outlook for one asset at its average return.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetOutlook {
    pub symbol: String,

    /// Annualized return in percent
    pub avg_return_pct: f64,

    /// Annualized volatility in percent
    pub volatility_pct: f64,

    /// `(1 + r)^5 - 1`, in percent
    pub five_year_growth_pct: f64,

    /// `(1 + r)^10 - 1`, in percent
    pub ten_year_growth_pct: f64,
}

/// How the market mood reads for a sentiment score in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentLabel {
    VeryNegative,
    Negative,
    Neutral,
    Positive,
    VeryPositive,
}

impl SentimentLabel {
    pub fn from_score(score: f64) -> Self {
        if score > 0.7 {
            SentimentLabel::VeryPositive
        } else if score > 0.6 {
            SentimentLabel::Positive
        } else if score < 0.3 {
            SentimentLabel::VeryNegative
        } else if score < 0.4 {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        }
    }
}

impl std::fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SentimentLabel::VeryNegative => write!(f, "very negative"),
            SentimentLabel::Negative => write!(f, "negative"),
            SentimentLabel::Neutral => write!(f, "neutral"),
            SentimentLabel::Positive => write!(f, "positive"),
            SentimentLabel::VeryPositive => write!(f, "very positive"),
        }
    }
}

/// What the report suggests doing next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// Sentiment above 0.6
    MaintainAllocation,
    /// Sentiment below 0.4
    ReviewForRebalancing,
    MonitorMarket,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        if score > 0.6 {
            Recommendation::MaintainAllocation
        } else if score < 0.4 {
            Recommendation::ReviewForRebalancing
        } else {
            Recommendation::MonitorMarket
        }
    }
}

impl std::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Recommendation::MaintainAllocation => {
                write!(f, "maintaining your current allocation strategy")
            }
            Recommendation::ReviewForRebalancing => {
                write!(f, "reviewing your portfolio for potential rebalancing")
            }
            Recommendation::MonitorMarket => write!(
                f,
                "monitoring market conditions closely before making significant changes"
            ),
        }
    }
}

/// Rule-based portfolio report built from the 5- and 10-year projections.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioReport {
    pub asset_count: usize,

    /// Sum of all allocations in percent (not necessarily 100)
    pub total_allocation: u32,

    /// Allocation-weighted average annual return (0.08 = 8%)
    pub weighted_return: f64,

    /// Value at month 0 of the projection
    pub start_value: f64,

    pub five_year_value: f64,
    pub ten_year_value: f64,

    /// Growth relative to `start_value`, in percent
    pub five_year_growth_pct: f64,
    pub ten_year_growth_pct: f64,

    /// Initial investment plus the pre-change monthly contribution over 5 years
    pub five_year_contributions: f64,
    pub ten_year_contributions: f64,

    /// Projected value minus contributions
    pub five_year_gains: f64,
    pub ten_year_gains: f64,

    /// Name of the asset with the highest average return
    pub top_performer: String,

    /// Name of the asset with the lowest average return
    pub bottom_performer: String,

    pub sentiment: SentimentLabel,
    pub recommendation: Recommendation,

    pub outlooks: Vec<AssetOutlook>,
}
