use serde::{Deserialize, Serialize};

use super::asset::Asset;
use super::projection::{ContributionSchedule, PortfolioProjections};

/// The in-memory state of one dashboard session: the assets being
/// projected, the contribution plan, and the last computed projections.
///
/// Nothing here is persisted; it lives as long as the session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Portfolio {
    /// Assets in the order they were added
    pub assets: Vec<Asset>,

    pub schedule: ContributionSchedule,

    /// Result of the last analysis run; empty until one happens
    #[serde(default)]
    pub projections: PortfolioProjections,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn find(&self, symbol: &str) -> Option<&Asset> {
        let upper = symbol.trim().to_uppercase();
        self.assets.iter().find(|a| a.symbol == upper)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.find(symbol).is_some()
    }
}
