use serde::{Deserialize, Serialize};

/// Sentiment assumed when nothing better is known.
pub const NEUTRAL_SENTIMENT: f64 = 0.5;

/// One news story about a portfolio holding, with a sentiment score in
/// `[0, 1]` (0 = very negative, 1 = very positive).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsItem {
    pub title: String,
    pub source: String,

    /// ISO date (`YYYY-MM-DD`) as reported
    pub date: String,
    pub url: String,
    pub summary: String,
    pub sentiment: f64,
}

/// The portfolio's news and the sentiment averaged over it.
///
/// A digest is always produced: when news can't be fetched it is empty,
/// neutral, and `error` says why.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsDigest {
    pub items: Vec<NewsItem>,
    pub sentiment: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NewsDigest {
    pub fn from_items(items: Vec<NewsItem>) -> Self {
        let sentiment = average_sentiment(&items);
        Self {
            items,
            sentiment,
            error: None,
        }
    }

    /// Empty, neutral digest carrying the reason news is missing.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            items: Vec::new(),
            sentiment: NEUTRAL_SENTIMENT,
            error: Some(error.into()),
        }
    }

    pub fn is_fallback(&self) -> bool {
        self.error.is_some()
    }
}

impl Default for NewsDigest {
    fn default() -> Self {
        Self::from_items(Vec::new())
    }
}

/// Mean sentiment of `items`; neutral when there are none.
pub fn average_sentiment(items: &[NewsItem]) -> f64 {
    if items.is_empty() {
        return NEUTRAL_SENTIMENT;
    }
    items.iter().map(|i| i.sentiment).sum::<f64>() / items.len() as f64
}
