use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single price data point (date → close).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub price: f64,
}

/// Latest quote for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,

    /// Short or long name reported by the data source, else the symbol
    pub name: String,

    /// Regular market price, if the source had one
    pub price: Option<f64>,

    /// Day change in percent, if the source had one
    pub change_pct: Option<f64>,
}

/// Cache key: (symbol, period, interval), e.g. ("AAPL", "10y", "1mo")
pub type HistoryCacheKey = (String, String, String);

#[derive(Debug, Clone)]
struct HistoryEntry {
    fetched_at: DateTime<Utc>,
    points: Vec<PricePoint>,
}

/// In-memory cache of fetched price histories with a fixed time-to-live.
///
/// Histories are monthly closes, so a few minutes of staleness is harmless;
/// the cache exists to avoid hammering the data source when the same symbol
/// is added, removed and re-added within a session.
#[derive(Debug, Clone, Default)]
pub struct HistoryCache {
    entries: HashMap<HistoryCacheKey, HistoryEntry>,
}

impl HistoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(symbol: &str, period: &str, interval: &str) -> HistoryCacheKey {
        (
            symbol.to_uppercase(),
            period.to_lowercase(),
            interval.to_lowercase(),
        )
    }

    /// Get a cached history if it was stored less than `ttl_secs` before `now`.
    pub fn get(
        &self,
        symbol: &str,
        period: &str,
        interval: &str,
        ttl_secs: u64,
        now: DateTime<Utc>,
    ) -> Option<Vec<PricePoint>> {
        let entry = self.entries.get(&Self::key(symbol, period, interval))?;
        let age = (now - entry.fetched_at).num_seconds();
        if age >= 0 && (age as u64) < ttl_secs {
            Some(entry.points.clone())
        } else {
            None
        }
    }

    pub fn insert(
        &mut self,
        symbol: &str,
        period: &str,
        interval: &str,
        points: Vec<PricePoint>,
        now: DateTime<Utc>,
    ) {
        self.entries.insert(
            Self::key(symbol, period, interval),
            HistoryEntry {
                fetched_at: now,
                points,
            },
        );
    }

    /// Drop every entry older than `ttl_secs`. Returns how many were removed.
    pub fn evict_expired(&mut self, ttl_secs: u64, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, e| (now - e.fetched_at).num_seconds() < ttl_secs as i64);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
