//! Property sweeps over random slack series and battery limits.

mod common;

use approx::assert_relative_eq;
use bess_sim::sim::cycle::CycleCounter;
use bess_sim::sim::{BatteryLimits, simulate};
use rand::{SeedableRng, rngs::StdRng};

#[test]
fn state_of_charge_stays_within_window() {
    let mut rng = StdRng::seed_from_u64(11);
    for seed in 0..50 {
        let limits = common::random_limits(&mut rng);
        let slack = common::random_slack(500, 25.0, seed);
        let result = simulate(&slack, &limits).unwrap();
        for (t, soc) in result.state_of_charge_mwh.iter().enumerate() {
            assert!(
                *soc >= limits.min_soc_mwh - 1e-9 && *soc <= limits.max_soc_mwh + 1e-9,
                "seed {seed} step {t}: soc {soc} outside [{}, {}]",
                limits.min_soc_mwh,
                limits.max_soc_mwh
            );
        }
    }
}

#[test]
fn per_step_flow_respects_power_limit() {
    let mut rng = StdRng::seed_from_u64(12);
    for seed in 0..50 {
        let limits = common::random_limits(&mut rng);
        let slack = common::random_slack(300, 40.0, seed);
        let result = simulate(&slack, &limits).unwrap();
        for flow in &result.energy_flow_mwh {
            // Delivered energy is at most P*eta, drawn energy at most P/eta.
            assert!(flow.abs() <= limits.power_limit_mw / limits.efficiency + 1e-9);
        }
    }
}

#[test]
fn trajectories_have_input_length() {
    let slack = common::random_slack(777, 10.0, 3);
    let result = simulate(&slack, &common::default_limits()).unwrap();
    assert_eq!(result.state_of_charge_mwh.len(), 777);
    assert_eq!(result.energy_flow_mwh.len(), 777);
}

#[test]
fn repeated_runs_are_identical() {
    let slack = common::random_slack(1000, 15.0, 4);
    let limits = common::default_limits();
    let a = simulate(&slack, &limits).unwrap();
    let b = simulate(&slack, &limits).unwrap();
    assert_eq!(a, b);
}

#[test]
fn cycle_steps_match_cycle_count_and_replay() {
    let mut rng = StdRng::seed_from_u64(13);
    for seed in 0..30 {
        let limits = common::random_limits(&mut rng);
        let slack = common::random_slack(1000, 30.0, seed);
        let result = simulate(&slack, &limits).unwrap();
        assert_eq!(result.full_cycle_count, result.cycle_completion_steps.len());

        let mut counter = CycleCounter::new();
        let replayed: Vec<usize> = result
            .state_of_charge_mwh
            .iter()
            .enumerate()
            .filter(|(_, soc)| counter.observe(**soc, limits.min_soc_mwh, limits.max_soc_mwh))
            .map(|(t, _)| t)
            .collect();
        assert_eq!(replayed, result.cycle_completion_steps);
    }
}

#[test]
fn lossless_energy_balance_closes() {
    // Starting at the floor, the final SoC equals the floor minus net delivered energy.
    let limits = BatteryLimits::from_fractions(10.0, 50.0, 1.0, 0.15, 0.95).unwrap();
    let slack = common::random_slack(400, 12.0, 5);
    let result = simulate(&slack, &limits).unwrap();
    let net_flow: f64 = result.energy_flow_mwh.iter().sum();
    let last = *result.state_of_charge_mwh.last().unwrap();
    assert_relative_eq!(limits.min_soc_mwh - net_flow, last, epsilon = 1e-6);
}

#[test]
fn imbalance_is_absolute_difference() {
    let slack = common::random_slack(240, 20.0, 6);
    let result = simulate(&slack, &common::default_limits()).unwrap();
    assert_relative_eq!(
        result.imbalance_mwh(),
        (result.unmet_deficit_mwh - result.unabsorbed_surplus_mwh).abs()
    );
    assert!(result.unmet_deficit_mwh >= 0.0);
    assert!(result.unabsorbed_surplus_mwh >= 0.0);
}
