//! Greedy hour-by-hour dispatch of the battery against a slack series.

use tracing::trace_span;

use super::cycle::CycleCounter;
use super::types::{BatteryLimits, DispatchResult};
use crate::error::{Result, SimError};

/// Mutable accumulator for one run. Never outlives [`simulate`].
#[derive(Debug)]
struct DispatchState {
    soc_mwh: f64,
    cycles: CycleCounter,
    unmet_deficit_mwh: f64,
    unabsorbed_surplus_mwh: f64,
}

impl DispatchState {
    fn new(limits: &BatteryLimits) -> Self {
        Self {
            soc_mwh: limits.min_soc_mwh,
            cycles: CycleCounter::new(),
            unmet_deficit_mwh: 0.0,
            unabsorbed_surplus_mwh: 0.0,
        }
    }

    /// Applies one step and returns the energy exchanged with the grid (MWh).
    ///
    /// Discharging divides the requested grid energy by efficiency to find the
    /// stored energy required; charging multiplies absorbed grid energy by
    /// efficiency to find the energy stored.
    fn step(&mut self, slack_mw: f64, limits: &BatteryLimits) -> f64 {
        let eta = limits.efficiency;
        let energy_flow = if slack_mw > 0.0 {
            let room_to_floor = self.soc_mwh - limits.min_soc_mwh;
            let discharge = (slack_mw / eta)
                .min(limits.power_limit_mw)
                .min(room_to_floor)
                .max(0.0);
            self.soc_mwh -= discharge;
            let delivered = discharge * eta;
            self.unmet_deficit_mwh += slack_mw - delivered;
            delivered
        } else if slack_mw < 0.0 {
            let surplus = slack_mw.abs();
            let room_to_ceiling = limits.max_soc_mwh - self.soc_mwh;
            let charge = (surplus * eta)
                .min(limits.power_limit_mw)
                .min(room_to_ceiling)
                .max(0.0);
            self.soc_mwh += charge;
            let drawn = charge / eta;
            self.unabsorbed_surplus_mwh += surplus - drawn;
            -drawn
        } else {
            0.0
        };

        // `clamp` would panic on a collapsed window; max/min does not.
        self.soc_mwh = self.soc_mwh.max(limits.min_soc_mwh).min(limits.max_soc_mwh);
        energy_flow
    }
}

/// Replays `slack_mw` through the battery and returns its trajectories.
///
/// Each call starts from a fresh state at the state-of-charge floor, so
/// identical inputs always produce identical results.
///
/// # Errors
///
/// Returns [`SimError::Config`] if `limits` are invalid and
/// [`SimError::InputValidation`] if the series contains a non-finite value.
///
/// # Examples
///
/// ```
/// use bess_sim::sim::dispatch::simulate;
/// use bess_sim::sim::types::BatteryLimits;
///
/// let limits = BatteryLimits::try_new(10.0, 10.0, 1.0, 1.0, 9.0).unwrap();
/// let result = simulate(&[5.0, -5.0], &limits).unwrap();
/// assert_eq!(result.state_of_charge_mwh, vec![1.0, 6.0]);
/// assert_eq!(result.unmet_deficit_mwh, 5.0);
/// ```
pub fn simulate(slack_mw: &[f64], limits: &BatteryLimits) -> Result<DispatchResult> {
    limits.validate()?;
    validate_series(slack_mw)?;
    Ok(run(slack_mw, limits))
}

/// Checks that every slack value is a finite number.
///
/// # Errors
///
/// Returns [`SimError::InputValidation`] naming the first offending step.
pub fn validate_series(slack_mw: &[f64]) -> Result<()> {
    match slack_mw.iter().position(|v| !v.is_finite()) {
        Some(step) => Err(SimError::InputValidation(format!(
            "slack value at step {step} is not a finite number"
        ))),
        None => Ok(()),
    }
}

/// Dispatch loop without validation, for callers that already checked inputs.
///
/// Tolerates a collapsed state-of-charge window (`min == max`), which the
/// optimizer may probe at zero capacity.
pub(crate) fn run(slack_mw: &[f64], limits: &BatteryLimits) -> DispatchResult {
    let _span = trace_span!("simulate", steps = slack_mw.len(), power_mw = limits.power_limit_mw)
        .entered();

    let mut state = DispatchState::new(limits);
    let mut state_of_charge_mwh = Vec::with_capacity(slack_mw.len());
    let mut energy_flow_mwh = Vec::with_capacity(slack_mw.len());
    let mut cycle_completion_steps = Vec::new();

    for (t, &slack) in slack_mw.iter().enumerate() {
        let flow = state.step(slack, limits);
        if state
            .cycles
            .observe(state.soc_mwh, limits.min_soc_mwh, limits.max_soc_mwh)
        {
            cycle_completion_steps.push(t);
        }
        state_of_charge_mwh.push(state.soc_mwh);
        energy_flow_mwh.push(flow);
    }

    DispatchResult {
        state_of_charge_mwh,
        energy_flow_mwh,
        full_cycle_count: state.cycles.full_cycles(),
        cycle_completion_steps,
        unmet_deficit_mwh: state.unmet_deficit_mwh,
        unabsorbed_surplus_mwh: state.unabsorbed_surplus_mwh,
    }
}
