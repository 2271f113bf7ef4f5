use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Average number of weeks in a month, used to turn a weekly contribution
/// into a monthly one. An approximation (52/12 ≈ 4.333).
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// How often the recurring contribution is paid in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContributionFrequency {
    None,
    Weekly,
    #[default]
    Monthly,
    Yearly,
}

impl ContributionFrequency {
    /// Convert a per-period amount into its monthly equivalent.
    pub fn monthly_amount(self, amount: f64) -> f64 {
        match self {
            ContributionFrequency::None => 0.0,
            ContributionFrequency::Weekly => amount * WEEKS_PER_MONTH,
            ContributionFrequency::Monthly => amount,
            ContributionFrequency::Yearly => amount / 12.0,
        }
    }
}

impl std::fmt::Display for ContributionFrequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContributionFrequency::None => write!(f, "none"),
            ContributionFrequency::Weekly => write!(f, "weekly"),
            ContributionFrequency::Monthly => write!(f, "monthly"),
            ContributionFrequency::Yearly => write!(f, "yearly"),
        }
    }
}

/// Money going into the projected portfolio.
///
/// The recurring amount steps to `new_recurring_amount` once, at month
/// `change_year * 12`, and stays there for the rest of the projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContributionSchedule {
    /// Lump sum present at month 0
    pub initial_investment: f64,

    /// Recurring amount per `frequency` period, before the change
    pub recurring_amount: f64,

    pub frequency: ContributionFrequency,

    /// Whole years after which the recurring amount changes
    pub change_year: u32,

    /// Recurring amount per `frequency` period, from the change onwards
    pub new_recurring_amount: f64,
}

impl Default for ContributionSchedule {
    fn default() -> Self {
        Self {
            initial_investment: 10_000.0,
            recurring_amount: 500.0,
            frequency: ContributionFrequency::Monthly,
            change_year: 3,
            new_recurring_amount: 1_000.0,
        }
    }
}

impl ContributionSchedule {
    /// A lump sum with nothing added afterwards.
    pub fn lump_sum(initial_investment: f64) -> Self {
        Self {
            initial_investment,
            recurring_amount: 0.0,
            frequency: ContributionFrequency::None,
            change_year: 0,
            new_recurring_amount: 0.0,
        }
    }

    /// Monthly contribution before the change month.
    pub fn monthly_contribution(&self) -> f64 {
        self.frequency.monthly_amount(self.recurring_amount)
    }

    /// Monthly contribution from the change month onwards.
    pub fn changed_monthly_contribution(&self) -> f64 {
        self.frequency.monthly_amount(self.new_recurring_amount)
    }

    /// The month index at which the recurring amount switches.
    pub fn change_month(&self) -> u32 {
        self.change_year.saturating_mul(12)
    }
}

/// One month of a projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectionPoint {
    pub date: NaiveDate,

    /// Total portfolio value at the end of that month
    pub value: f64,
}

/// The pair of horizons shown on the dashboard.
/// Each series is an independent simulation, not a slice of the other.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PortfolioProjections {
    pub five_year: Vec<ProjectionPoint>,
    pub ten_year: Vec<ProjectionPoint>,
}

impl PortfolioProjections {
    pub fn is_empty(&self) -> bool {
        self.five_year.is_empty() && self.ten_year.is_empty()
    }
}
