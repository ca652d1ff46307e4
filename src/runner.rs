//! End-to-end study: load slack, size the battery, run the canonical dispatch,
//! and aggregate the result.

use std::path::Path;

use tracing::{info, warn};

use crate::config::{BatteryConfig, ScenarioConfig};
use crate::error::Result;
use crate::io::input::{SlackTable, read_slack_csv};
use crate::report::{MonthAssignment, MonthlyTotals, PeriodProfiles, monthly_totals};
use crate::sim::dispatch;
use crate::sim::kpi::KpiReport;
use crate::sim::optimizer::{InitialGuess, OptimizationResult, ParameterOptimizer};
use crate::sim::types::{BatteryLimits, DispatchResult};
use crate::synthetic::SyntheticSlack;

/// Ordered slack series plus whatever the source said about months and defaults.
#[derive(Debug, Clone)]
pub struct SlackInput {
    pub slack_mw: Vec<f64>,
    pub months: MonthAssignment,
    /// Power default from the input table (MW).
    pub power_mw: Option<f64>,
    /// Capacity default from the input table (MWh).
    pub capacity_mwh: Option<f64>,
}

impl SlackInput {
    /// Loads the series from `csv` if given, else from `[input] slack_csv`,
    /// else generates it from `[synthetic]`.
    ///
    /// # Errors
    ///
    /// Returns an error if the CSV cannot be read or fails validation.
    pub fn load(config: &ScenarioConfig, csv: Option<&Path>) -> Result<Self> {
        match csv.or(config.input.slack_csv.as_deref()) {
            Some(path) => {
                let table = read_slack_csv(path)?;
                info!(path = %path.display(), steps = table.slack_mw.len(), "loaded slack series");
                Ok(Self::from_table(table, config.report.steps_per_month))
            }
            None => Ok(Self::synthetic(config)),
        }
    }

    /// Wraps a parsed table; calendar months are used when it has timestamps.
    pub fn from_table(table: SlackTable, steps_per_month: usize) -> Self {
        let months = match table.timestamps {
            Some(stamps) => MonthAssignment::Calendar(stamps),
            None => MonthAssignment::Fixed { steps_per_month },
        };
        Self {
            slack_mw: table.slack_mw,
            months,
            power_mw: table.power_mw,
            capacity_mwh: table.capacity_mwh,
        }
    }

    /// Generates the series described by `[synthetic]`.
    pub fn synthetic(config: &ScenarioConfig) -> Self {
        let syn = &config.synthetic;
        let steps = syn.days * syn.steps_per_day;
        let slack_mw = SyntheticSlack::from_config(syn).generate(steps);
        info!(steps, seed = syn.seed, "generated synthetic slack series");
        Self {
            slack_mw,
            months: MonthAssignment::Fixed {
                steps_per_month: config.report.steps_per_month,
            },
            power_mw: None,
            capacity_mwh: None,
        }
    }
}

/// Values that take precedence over both the input table and the scenario.
#[derive(Debug, Clone, Copy, Default)]
pub struct BatteryOverrides {
    pub power_mw: Option<f64>,
    pub capacity_mwh: Option<f64>,
}

/// Everything a study produces.
#[derive(Debug, Clone)]
pub struct StudyResult {
    /// Limits of the canonical run.
    pub limits: BatteryLimits,
    pub optimization: Option<OptimizationResult>,
    pub dispatch: DispatchResult,
    pub profiles: PeriodProfiles,
    pub monthly: Vec<MonthlyTotals>,
    pub kpis: KpiReport,
}

/// Resolves the battery parameters: overrides, then table defaults, then scenario.
pub fn resolve_battery(
    config: &BatteryConfig,
    input: &SlackInput,
    overrides: &BatteryOverrides,
) -> BatteryConfig {
    BatteryConfig {
        power_mw: overrides
            .power_mw
            .or(input.power_mw)
            .unwrap_or(config.power_mw),
        capacity_mwh: overrides
            .capacity_mwh
            .or(input.capacity_mwh)
            .unwrap_or(config.capacity_mwh),
        ..config.clone()
    }
}

/// Runs the optional sizing search, the canonical dispatch, and aggregation.
///
/// # Errors
///
/// Returns an error for invalid battery parameters, a non-finite series, or a
/// series that cannot be split into whole report periods. Optimizer
/// non-convergence is logged, not returned.
pub fn run_study(
    config: &ScenarioConfig,
    input: &SlackInput,
    overrides: &BatteryOverrides,
) -> Result<StudyResult> {
    let battery = resolve_battery(&config.battery, input, overrides);
    let base = battery.limits()?;
    let slack = input.slack_mw.as_slice();

    let (limits, optimization, result) = if config.optimizer.enabled {
        let guess = InitialGuess {
            power_mw: battery.power_mw,
            capacity_mwh: battery.capacity_mwh,
        };
        let mut problem = ParameterOptimizer::new(slack, base, guess, config.optimizer.settings())?;
        let optimization = problem.run();
        if !optimization.converged {
            warn!(
                iterations = optimization.iterations,
                evaluations = optimization.evaluations,
                "optimizer did not converge; using best parameters found"
            );
        }
        let limits = problem
            .candidate_limits(optimization.peak_power_mw, optimization.energy_capacity_mwh);
        let result = dispatch::run(slack, &limits);
        (limits, Some(optimization), result)
    } else {
        let result = dispatch::simulate(slack, &base)?;
        (base, None, result)
    };

    info!(
        steps = result.len(),
        full_cycles = result.full_cycle_count,
        unmet_deficit_mwh = result.unmet_deficit_mwh,
        unabsorbed_surplus_mwh = result.unabsorbed_surplus_mwh,
        "canonical dispatch finished"
    );

    let profiles = PeriodProfiles::from_run(slack, &result, config.report.period_steps)?;
    let monthly = monthly_totals(slack, &result, |i| input.months.month_of(i));
    let kpis = KpiReport::from_result(&result, &limits, optimization.as_ref());

    Ok(StudyResult {
        limits,
        optimization,
        dispatch: result,
        profiles,
        monthly,
        kpis,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimError;

    fn input(slack_mw: Vec<f64>) -> SlackInput {
        SlackInput {
            slack_mw,
            months: MonthAssignment::Fixed { steps_per_month: 720 },
            power_mw: Some(20.0),
            capacity_mwh: Some(80.0),
        }
    }

    #[test]
    fn overrides_beat_table_defaults_beat_scenario() {
        let cfg = BatteryConfig::default();
        let from_table = resolve_battery(&cfg, &input(vec![0.0]), &BatteryOverrides::default());
        assert_eq!(from_table.power_mw, 20.0);
        assert_eq!(from_table.capacity_mwh, 80.0);

        let overridden = resolve_battery(
            &cfg,
            &input(vec![0.0]),
            &BatteryOverrides {
                power_mw: Some(5.0),
                capacity_mwh: None,
            },
        );
        assert_eq!(overridden.power_mw, 5.0);
        assert_eq!(overridden.capacity_mwh, 80.0);

        let mut bare = input(vec![0.0]);
        bare.power_mw = None;
        bare.capacity_mwh = None;
        let fallback = resolve_battery(&cfg, &bare, &BatteryOverrides::default());
        assert_eq!(fallback.power_mw, 10.0);
        assert_eq!(fallback.capacity_mwh, 50.0);
    }

    #[test]
    fn study_without_optimizer_uses_configured_limits() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.optimizer.enabled = false;
        let study = run_study(&cfg, &input(vec![-3.0; 48]), &BatteryOverrides::default()).unwrap();
        assert!(study.optimization.is_none());
        assert_eq!(study.limits.power_limit_mw, 20.0);
        assert_eq!(study.dispatch.len(), 48);
        assert_eq!(study.profiles.period, 24);
        assert_eq!(study.monthly.len(), 1);
    }

    #[test]
    fn study_with_optimizer_reports_sized_parameters() {
        let cfg = ScenarioConfig::balanced();
        let slack = SlackInput::synthetic(&cfg);
        let study = run_study(&cfg, &slack, &BatteryOverrides::default()).unwrap();
        let opt = study.optimization.as_ref().unwrap();
        assert_eq!(study.limits.power_limit_mw, opt.peak_power_mw);
        assert_eq!(study.kpis.capacity_mwh, opt.energy_capacity_mwh);
        assert_eq!(study.dispatch.imbalance_mwh(), opt.objective_mwh);
    }

    #[test]
    fn indivisible_series_fails_in_aggregation() {
        let mut cfg = ScenarioConfig::baseline();
        cfg.optimizer.enabled = false;
        let err = run_study(&cfg, &input(vec![1.0; 25]), &BatteryOverrides::default()).unwrap_err();
        assert!(matches!(err, SimError::Shape { len: 25, period: 24 }));
    }

    #[test]
    fn invalid_table_default_is_a_config_error() {
        let mut bad = input(vec![1.0; 24]);
        bad.power_mw = Some(0.0);
        let err = run_study(&ScenarioConfig::baseline(), &bad, &BatteryOverrides::default())
            .unwrap_err();
        assert!(matches!(err, SimError::Config(_)));
    }

    #[test]
    fn synthetic_input_has_configured_length() {
        let cfg = ScenarioConfig::baseline();
        let slack = SlackInput::load(&cfg, None).unwrap();
        assert_eq!(slack.slack_mw.len(), 30 * 24);
        assert_eq!(slack.months, MonthAssignment::Fixed { steps_per_month: 720 });
    }
}
