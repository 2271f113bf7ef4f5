use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The category of an asset, as picked in the "add asset" form.
/// Purely descriptive: every category is priced from the same monthly history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Stock,
    Commodity,
    Bond,
    Index,
    Crypto,
    Currency,
}

impl std::fmt::Display for AssetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AssetType::Stock => write!(f, "Stock"),
            AssetType::Commodity => write!(f, "Commodity"),
            AssetType::Bond => write!(f, "Bond"),
            AssetType::Index => write!(f, "Index"),
            AssetType::Crypto => write!(f, "Crypto"),
            AssetType::Currency => write!(f, "Currency"),
        }
    }
}

/// Annualized statistics derived from a monthly price history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnStats {
    /// Mean monthly return, compounded to a year (0.10 = 10%)
    pub avg_return: f64,

    /// Standard deviation of monthly returns, scaled by √12
    pub volatility: f64,
}

impl ReturnStats {
    /// Fallback used when a history is too short to say anything useful.
    pub const DEFAULT: ReturnStats = ReturnStats {
        avg_return: 0.05,
        volatility: 0.15,
    };
}

/// A weighted position in the projected portfolio.
///
/// `allocation` is a whole percent of the portfolio value. Allocations across
/// assets are not normalized: the projection uses them exactly as given.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    /// Session-unique identifier, used for removal
    pub id: Uuid,

    /// Ticker symbol, uppercased (e.g., "AAPL", "GC=F", "BTC-USD")
    pub symbol: String,

    /// Display name (falls back to the symbol)
    pub name: String,

    pub asset_type: AssetType,

    /// Percent of portfolio value assigned to this asset (1–100)
    pub allocation: u8,

    /// Annualized return used for growth
    pub avg_return: f64,

    /// Annualized volatility; informational only, never used by projections
    pub volatility: f64,
}

impl Asset {
    pub fn new(
        symbol: impl Into<String>,
        name: impl Into<String>,
        asset_type: AssetType,
        allocation: u8,
        stats: ReturnStats,
    ) -> Self {
        let symbol = symbol.into().trim().to_uppercase();
        let name = name.into();
        let name = if name.trim().is_empty() {
            symbol.clone()
        } else {
            name
        };
        Self {
            id: Uuid::new_v4(),
            symbol,
            name,
            asset_type,
            allocation,
            avg_return: stats.avg_return,
            volatility: stats.volatility,
        }
    }

    /// Convenience constructor for tests and offline use: a stock with a
    /// known return and zero volatility.
    pub fn with_return(symbol: impl Into<String>, allocation: u8, avg_return: f64) -> Self {
        Self::new(
            symbol,
            "",
            AssetType::Stock,
            allocation,
            ReturnStats {
                avg_return,
                volatility: 0.0,
            },
        )
    }

    /// Allocation as a fraction of the total (20 → 0.2).
    pub fn weight(&self) -> f64 {
        f64::from(self.allocation) / 100.0
    }

    /// Per-month growth rate equivalent to `avg_return` per year.
    pub fn monthly_rate(&self) -> f64 {
        (1.0 + self.avg_return).powf(1.0 / 12.0) - 1.0
    }

    pub fn stats(&self) -> ReturnStats {
        ReturnStats {
            avg_return: self.avg_return,
            volatility: self.volatility,
        }
    }
}
