use chrono::{Months, NaiveDate};

use crate::models::asset::Asset;
use crate::models::projection::{ContributionSchedule, PortfolioProjections, ProjectionPoint};

/// Longest horizon simulated; longer requests are clamped to it.
pub const MAX_HORIZON_YEARS: u32 = 100;

/// Simulates portfolio value month by month.
///
/// Every call is an independent, stateless simulation: the 5- and 10-year
/// series on the dashboard are two runs, never one run sliced.
pub struct ProjectionService;

impl ProjectionService {
    pub fn new() -> Self {
        Self
    }

    /// Project the value of `assets` under `schedule` for `horizon_years`.
    ///
    /// For month 0 the series holds the initial investment as-is. For every
    /// later month:
    /// 1. switch to the new recurring amount if this is the change month
    /// 2. add the monthly contribution
    /// 3. split the total by allocation (as given, not normalized)
    /// 4. grow each share by `(1 + avg_return)^(1/12) - 1`
    /// 5. sum the shares back into the total
    ///
    /// Returns `horizon_years * 12 + 1` points, or an empty series when
    /// there are no assets. Horizons past [`MAX_HORIZON_YEARS`] are clamped.
    pub fn project(
        &self,
        assets: &[Asset],
        schedule: &ContributionSchedule,
        horizon_years: u32,
        start: NaiveDate,
    ) -> Vec<ProjectionPoint> {
        if assets.is_empty() {
            return Vec::new();
        }

        let horizon_years = if horizon_years > MAX_HORIZON_YEARS {
            tracing::warn!(
                requested = horizon_years,
                max = MAX_HORIZON_YEARS,
                "projection horizon clamped"
            );
            MAX_HORIZON_YEARS
        } else {
            horizon_years
        };
        let months = horizon_years * 12;
        let change_month = schedule.change_month();
        let rates: Vec<(f64, f64)> = assets
            .iter()
            .map(|a| (a.weight(), a.monthly_rate()))
            .collect();

        let mut points = Vec::with_capacity(months as usize + 1);
        let mut total = schedule.initial_investment;
        let mut monthly = schedule.monthly_contribution();

        for month in 0..=months {
            if month == change_month {
                monthly = schedule.changed_monthly_contribution();
            }

            if month > 0 {
                let invested = total + monthly;
                total = rates
                    .iter()
                    .map(|&(weight, rate)| invested * weight * (1.0 + rate))
                    .sum();
            }

            points.push(ProjectionPoint {
                date: add_months(start, month),
                value: total,
            });
        }

        tracing::debug!(
            assets = assets.len(),
            horizon_years,
            final_value = total,
            "projection complete"
        );
        points
    }

    /// The two dashboard horizons, each simulated on its own.
    pub fn project_portfolio(
        &self,
        assets: &[Asset],
        schedule: &ContributionSchedule,
        start: NaiveDate,
    ) -> PortfolioProjections {
        PortfolioProjections {
            five_year: self.project(assets, schedule, 5, start),
            ten_year: self.project(assets, schedule, 10, start),
        }
    }

    /// Thin a series for plotting: keep every `max(1, len / target)`-th point.
    pub fn downsample(points: &[ProjectionPoint], target: usize) -> Vec<ProjectionPoint> {
        let step = if target == 0 {
            1
        } else {
            (points.len() / target).max(1)
        };
        points.iter().step_by(step).cloned().collect()
    }
}

impl Default for ProjectionService {
    fn default() -> Self {
        Self::new()
    }
}

/// Calendar month addition; the day is clamped to the end of shorter months
/// (Jan 31 + 1 month = Feb 28/29).
fn add_months(start: NaiveDate, months: u32) -> NaiveDate {
    start
        .checked_add_months(Months::new(months))
        .unwrap_or(NaiveDate::MAX)
}
