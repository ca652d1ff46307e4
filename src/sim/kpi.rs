//! Post-hoc KPI computation from a dispatch run.

use std::fmt;

use super::optimizer::OptimizationResult;
use super::types::{BatteryLimits, DispatchResult};

/// Headline figures for one canonical dispatch run.
///
/// Computed post-hoc from a [`DispatchResult`] so reported numbers always
/// agree with the trajectories.
#[derive(Debug, Clone)]
pub struct KpiReport {
    /// Number of simulated steps.
    pub steps: usize,
    /// Power limit used for the run (MW).
    pub power_mw: f64,
    /// Energy capacity reported for the run (MWh).
    pub capacity_mwh: f64,
    /// Floor-to-ceiling cycles.
    pub full_cycles: usize,
    /// Throughput-based cycles: `(delivered + absorbed) / (2 * usable energy)`.
    pub equivalent_full_cycles: f64,
    /// Deficit left uncovered (MWh).
    pub unmet_deficit_mwh: f64,
    /// Surplus left unabsorbed (MWh).
    pub unabsorbed_surplus_mwh: f64,
    /// Energy delivered to the grid (MWh).
    pub energy_delivered_mwh: f64,
    /// Energy drawn from the grid (MWh, positive magnitude).
    pub energy_absorbed_mwh: f64,
    /// Optimizer outcome, when sizing ran.
    pub optimization: Option<OptimizationResult>,
}

impl KpiReport {
    /// Computes all KPIs for `result`, produced with `limits`.
    pub fn from_result(
        result: &DispatchResult,
        limits: &BatteryLimits,
        optimization: Option<&OptimizationResult>,
    ) -> Self {
        let energy_delivered_mwh = result.energy_delivered_mwh();
        let energy_absorbed_mwh = result.energy_absorbed_mwh();
        let usable = limits.usable_energy_mwh();
        let equivalent_full_cycles = if usable > 0.0 {
            (energy_delivered_mwh + energy_absorbed_mwh) / (2.0 * usable)
        } else {
            0.0
        };

        Self {
            steps: result.len(),
            power_mw: limits.power_limit_mw,
            capacity_mwh: optimization
                .map_or(limits.energy_capacity_mwh, |o| o.energy_capacity_mwh),
            full_cycles: result.full_cycle_count,
            equivalent_full_cycles,
            unmet_deficit_mwh: result.unmet_deficit_mwh,
            unabsorbed_surplus_mwh: result.unabsorbed_surplus_mwh,
            energy_delivered_mwh,
            energy_absorbed_mwh,
            optimization: optimization.cloned(),
        }
    }

    /// `|unmet deficit - unabsorbed surplus|` (MWh).
    pub fn imbalance_mwh(&self) -> f64 {
        (self.unmet_deficit_mwh - self.unabsorbed_surplus_mwh).abs()
    }
}

impl fmt::Display for KpiReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- BESS Report ---")?;
        if let Some(opt) = &self.optimization {
            writeln!(
                f,
                "Optimized peak power:  {:.2} MW",
                opt.peak_power_mw
            )?;
            writeln!(
                f,
                "Optimized capacity:    {:.2} MWh",
                opt.energy_capacity_mwh
            )?;
            writeln!(
                f,
                "Optimizer:             {} after {} iterations ({} runs), objective {:.4} MWh",
                if opt.converged { "converged" } else { "NOT converged" },
                opt.iterations,
                opt.evaluations,
                opt.objective_mwh
            )?;
        }
        writeln!(f, "Power limit:           {:.2} MW", self.power_mw)?;
        writeln!(f, "Capacity:              {:.2} MWh", self.capacity_mwh)?;
        writeln!(f, "Steps simulated:       {}", self.steps)?;
        writeln!(f, "Full cycles:           {}", self.full_cycles)?;
        writeln!(f, "Equivalent cycles:     {:.2}", self.equivalent_full_cycles)?;
        writeln!(f, "Unmet deficit:         {:.3} MWh", self.unmet_deficit_mwh)?;
        writeln!(f, "Unabsorbed surplus:    {:.3} MWh", self.unabsorbed_surplus_mwh)?;
        writeln!(f, "Imbalance:             {:.3} MWh", self.imbalance_mwh())?;
        write!(
            f,
            "Battery throughput:    {:.3} MWh out, {:.3} MWh in",
            self.energy_delivered_mwh, self.energy_absorbed_mwh
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(flow: Vec<f64>) -> DispatchResult {
        DispatchResult {
            state_of_charge_mwh: vec![5.0; flow.len()],
            energy_flow_mwh: flow,
            full_cycle_count: 1,
            cycle_completion_steps: vec![2],
            unmet_deficit_mwh: 3.0,
            unabsorbed_surplus_mwh: 1.0,
        }
    }

    fn limits() -> BatteryLimits {
        BatteryLimits::try_new(10.0, 10.0, 1.0, 1.0, 9.0).unwrap()
    }

    #[test]
    fn equivalent_cycles_use_usable_energy() {
        // throughput 16 MWh over an 8 MWh window => 1 equivalent cycle
        let kpi = KpiReport::from_result(&result(vec![-8.0, 8.0]), &limits(), None);
        assert!((kpi.equivalent_full_cycles - 1.0).abs() < 1e-12);
        assert_eq!(kpi.full_cycles, 1);
        assert_eq!(kpi.imbalance_mwh(), 2.0);
    }

    #[test]
    fn optimized_capacity_is_reported() {
        let opt = OptimizationResult {
            peak_power_mw: 7.0,
            energy_capacity_mwh: 33.0,
            converged: false,
            objective_mwh: 0.5,
            iterations: 3,
            evaluations: 12,
        };
        let kpi = KpiReport::from_result(&result(vec![1.0]), &limits(), Some(&opt));
        assert_eq!(kpi.capacity_mwh, 33.0);
        let text = format!("{kpi}");
        assert!(text.contains("NOT converged"));
        assert!(text.contains("Full cycles:           1"));
    }

    #[test]
    fn empty_run_displays() {
        let kpi = KpiReport::from_result(&result(Vec::new()), &limits(), None);
        assert_eq!(kpi.steps, 0);
        assert!(!format!("{kpi}").is_empty());
    }
}
