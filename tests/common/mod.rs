//! Shared test fixtures for integration tests.

#![allow(dead_code)]

use bess_sim::config::ScenarioConfig;
use bess_sim::report::MonthAssignment;
use bess_sim::runner::SlackInput;
use bess_sim::sim::BatteryLimits;
use rand::{Rng, SeedableRng, rngs::StdRng};

/// Default battery (10 MW, 50 MWh, 97% efficiency, 15–95% window).
pub fn default_limits() -> BatteryLimits {
    BatteryLimits::from_fractions(10.0, 50.0, 0.97, 0.15, 0.95)
        .expect("default limits should be valid")
}

/// Uniform random slack in `[-amplitude, amplitude]` MW.
pub fn random_slack(steps: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..steps)
        .map(|_| rng.random_range(-amplitude..=amplitude))
        .collect()
}

/// Random battery limits with a valid, non-empty window.
pub fn random_limits(rng: &mut StdRng) -> BatteryLimits {
    let capacity = rng.random_range(1.0..100.0);
    let min_frac = rng.random_range(0.0..0.4);
    let max_frac = rng.random_range(0.6..=1.0);
    BatteryLimits::from_fractions(
        rng.random_range(0.5..20.0),
        capacity,
        rng.random_range(0.5..=1.0),
        min_frac,
        max_frac,
    )
    .expect("random limits should be valid")
}

/// Slack input with fixed 720-step months and no table defaults.
pub fn slack_input(slack_mw: Vec<f64>) -> SlackInput {
    SlackInput {
        slack_mw,
        months: MonthAssignment::Fixed { steps_per_month: 720 },
        power_mw: None,
        capacity_mwh: None,
    }
}

/// Baseline scenario with the sizing search disabled.
pub fn fixed_battery_scenario() -> ScenarioConfig {
    let mut cfg = ScenarioConfig::baseline();
    cfg.optimizer.enabled = false;
    cfg
}
