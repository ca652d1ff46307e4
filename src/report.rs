//! Aggregated views of a dispatch run: averaged period profiles and monthly totals.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{Datelike, NaiveDateTime};

use crate::error::{Result, SimError};
use crate::sim::types::DispatchResult;

/// Averages `series` over consecutive segments of `period` steps.
///
/// Segment `k` covers steps `k * period .. (k + 1) * period`; the returned
/// profile holds, for each offset within a period, the mean over all segments.
///
/// # Errors
///
/// Returns [`SimError::Shape`] if `period` is zero, the series is empty, or
/// its length is not a multiple of `period`.
///
/// # Examples
///
/// ```
/// use bess_sim::report::average_profile;
///
/// let profile = average_profile(&[1.0, 2.0, 3.0, 4.0], 2).unwrap();
/// assert_eq!(profile, vec![2.0, 3.0]);
/// ```
pub fn average_profile(series: &[f64], period: usize) -> Result<Vec<f64>> {
    if period == 0 || series.is_empty() || series.len() % period != 0 {
        return Err(SimError::Shape {
            len: series.len(),
            period,
        });
    }

    let segments = series.len() / period;
    let mut profile = vec![0.0; period];
    for segment in series.chunks_exact(period) {
        for (acc, v) in profile.iter_mut().zip(segment) {
            *acc += v;
        }
    }
    for acc in &mut profile {
        *acc /= segments as f64;
    }
    Ok(profile)
}

/// Averaged period profiles of every trajectory of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodProfiles {
    /// Steps per period.
    pub period: usize,
    pub state_of_charge_mwh: Vec<f64>,
    pub energy_flow_mwh: Vec<f64>,
    pub slack_mw: Vec<f64>,
}

impl PeriodProfiles {
    /// Averages all trajectories of `result` and the input `slack_mw`.
    ///
    /// # Errors
    ///
    /// Returns [`SimError::Shape`] if the run cannot be split into whole periods.
    pub fn from_run(slack_mw: &[f64], result: &DispatchResult, period: usize) -> Result<Self> {
        Ok(Self {
            period,
            state_of_charge_mwh: average_profile(&result.state_of_charge_mwh, period)?,
            energy_flow_mwh: average_profile(&result.energy_flow_mwh, period)?,
            slack_mw: average_profile(slack_mw, period)?,
        })
    }
}

impl fmt::Display for PeriodProfiles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Average Profile ({} steps) ---", self.period)?;
        writeln!(f, "{:>6} {:>12} {:>12} {:>12}", "step", "soc_mwh", "flow_mwh", "slack_mw")?;
        for i in 0..self.period {
            writeln!(
                f,
                "{:>6} {:>12.3} {:>12.3} {:>12.3}",
                i, self.state_of_charge_mwh[i], self.energy_flow_mwh[i], self.slack_mw[i]
            )?;
        }
        Ok(())
    }
}

/// Assigns each step index to a 1-based month label.
#[derive(Debug, Clone, PartialEq)]
pub enum MonthAssignment {
    /// Fixed-length months: step `i` is in month `i / steps_per_month + 1`.
    Fixed { steps_per_month: usize },
    /// Calendar months of per-step timestamps, numbered from 1 at the first
    /// timestamp's month.
    Calendar(Vec<NaiveDateTime>),
}

impl MonthAssignment {
    /// Month label of step `index`.
    ///
    /// Calendar assignment falls back to the last timestamp for indices past
    /// the end of the timestamp list.
    pub fn month_of(&self, index: usize) -> u32 {
        match self {
            Self::Fixed { steps_per_month } => {
                (index / (*steps_per_month).max(1)) as u32 + 1
            }
            Self::Calendar(stamps) => {
                let (Some(first), Some(last)) = (stamps.first(), stamps.last()) else {
                    return 1;
                };
                let stamp = stamps.get(index).unwrap_or(last);
                let months = (stamp.year() - first.year()) * 12 + stamp.month() as i32
                    - first.month() as i32;
                months.max(0) as u32 + 1
            }
        }
    }
}

/// Per-month energy totals.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonthlyTotals {
    /// 1-based month label.
    pub month: u32,
    /// Sum of positive slack (MW·h).
    pub deficit_mwh: f64,
    /// Sum of negative slack (MW·h, negative).
    pub surplus_mwh: f64,
    /// Sum of positive energy flow: delivered by the battery (MWh).
    pub from_battery_mwh: f64,
    /// Sum of negative energy flow: drawn by the battery (MWh, negative).
    pub to_battery_mwh: f64,
    /// Full cycles completed within the month.
    pub cycles: usize,
}

/// Groups slack and energy flow by month and sums each sign separately.
///
/// Only months that contain at least one step appear, in ascending order.
pub fn monthly_totals(
    slack_mw: &[f64],
    result: &DispatchResult,
    month_of: impl Fn(usize) -> u32,
) -> Vec<MonthlyTotals> {
    let mut months: BTreeMap<u32, MonthlyTotals> = BTreeMap::new();

    for (i, (&slack, &flow)) in slack_mw.iter().zip(&result.energy_flow_mwh).enumerate() {
        let month = month_of(i);
        let totals = months.entry(month).or_insert_with(|| MonthlyTotals {
            month,
            ..MonthlyTotals::default()
        });
        if slack > 0.0 {
            totals.deficit_mwh += slack;
        } else if slack < 0.0 {
            totals.surplus_mwh += slack;
        }
        if flow > 0.0 {
            totals.from_battery_mwh += flow;
        } else if flow < 0.0 {
            totals.to_battery_mwh += flow;
        }
    }

    for &step in &result.cycle_completion_steps {
        if let Some(totals) = months.get_mut(&month_of(step)) {
            totals.cycles += 1;
        }
    }

    months.into_values().collect()
}

/// Renders monthly totals as a fixed-width table.
pub struct MonthlyTable<'a>(pub &'a [MonthlyTotals]);

impl fmt::Display for MonthlyTable<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Monthly Totals ---")?;
        writeln!(
            f,
            "{:>5} {:>12} {:>12} {:>14} {:>14} {:>7}",
            "month", "deficit", "surplus", "from_battery", "to_battery", "cycles"
        )?;
        for m in self.0 {
            writeln!(
                f,
                "{:>5} {:>12.3} {:>12.3} {:>14.3} {:>14.3} {:>7}",
                m.month, m.deficit_mwh, m.surplus_mwh, m.from_battery_mwh, m.to_battery_mwh, m.cycles
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    fn run(flow: Vec<f64>, cycle_steps: Vec<usize>) -> DispatchResult {
        DispatchResult {
            state_of_charge_mwh: vec![1.0; flow.len()],
            energy_flow_mwh: flow,
            full_cycle_count: cycle_steps.len(),
            cycle_completion_steps: cycle_steps,
            unmet_deficit_mwh: 0.0,
            unabsorbed_surplus_mwh: 0.0,
        }
    }

    #[test]
    fn constant_series_averages_to_constant() {
        let profile = average_profile(&[3.5; 72], 24).unwrap();
        assert_eq!(profile, vec![3.5; 24]);
    }

    #[test]
    fn profile_averages_each_offset() {
        let series: Vec<f64> = (0..6).map(f64::from).collect();
        assert_eq!(average_profile(&series, 3).unwrap(), vec![1.5, 2.5, 3.5]);
    }

    #[test]
    fn indivisible_length_is_a_shape_error() {
        let err = average_profile(&[0.0; 25], 24).unwrap_err();
        assert!(matches!(err, SimError::Shape { len: 25, period: 24 }));
    }

    #[test]
    fn zero_period_and_empty_series_are_shape_errors() {
        assert!(matches!(average_profile(&[1.0], 0), Err(SimError::Shape { .. })));
        assert!(matches!(average_profile(&[], 24), Err(SimError::Shape { .. })));
    }

    #[test]
    fn profiles_cover_all_trajectories() {
        let result = run(vec![1.0, -1.0, 3.0, -3.0], Vec::new());
        let profiles = PeriodProfiles::from_run(&[2.0, 0.0, 4.0, 0.0], &result, 2).unwrap();
        assert_eq!(profiles.energy_flow_mwh, vec![2.0, -2.0]);
        assert_eq!(profiles.slack_mw, vec![3.0, 0.0]);
        assert_eq!(profiles.state_of_charge_mwh, vec![1.0, 1.0]);
        assert!(format!("{profiles}").contains("Average Profile"));
    }

    #[test]
    fn fixed_months_are_one_based() {
        let months = MonthAssignment::Fixed { steps_per_month: 720 };
        assert_eq!(months.month_of(0), 1);
        assert_eq!(months.month_of(719), 1);
        assert_eq!(months.month_of(720), 2);
    }

    #[test]
    fn calendar_months_span_year_boundary() {
        let at = |y, m, d| {
            NaiveDate::from_ymd_opt(y, m, d)
                .and_then(|date| date.and_hms_opt(0, 0, 0))
                .unwrap()
        };
        let months = MonthAssignment::Calendar(vec![at(2023, 12, 31), at(2024, 1, 1), at(2024, 2, 1)]);
        assert_eq!(months.month_of(0), 1);
        assert_eq!(months.month_of(1), 2);
        assert_eq!(months.month_of(2), 3);
        assert_eq!(months.month_of(10), 3);
    }

    #[test]
    fn monthly_totals_split_signs_and_cycles() {
        let slack = [5.0, -2.0, 0.0, -4.0, 1.0, 3.0];
        let result = run(vec![4.0, -2.0, 0.0, -3.0, 1.0, 0.0], vec![1, 3, 4]);
        let totals = monthly_totals(&slack, &result, |i| (i / 3) as u32 + 1);
        assert_eq!(totals.len(), 2);

        assert_eq!(totals[0].month, 1);
        assert_eq!(totals[0].deficit_mwh, 5.0);
        assert_eq!(totals[0].surplus_mwh, -2.0);
        assert_eq!(totals[0].from_battery_mwh, 4.0);
        assert_eq!(totals[0].to_battery_mwh, -2.0);
        assert_eq!(totals[0].cycles, 1);

        assert_eq!(totals[1].month, 2);
        assert_eq!(totals[1].deficit_mwh, 4.0);
        assert_eq!(totals[1].surplus_mwh, -4.0);
        assert_eq!(totals[1].from_battery_mwh, 1.0);
        assert_eq!(totals[1].to_battery_mwh, -3.0);
        assert_eq!(totals[1].cycles, 2);

        let table = format!("{}", MonthlyTable(&totals));
        assert_eq!(table.lines().count(), 4);
    }
}
