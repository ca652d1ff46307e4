//! Core simulation types: battery limits and dispatch results.

use std::fmt;

use crate::config::ConfigError;

/// Absolute operating limits of the battery for one dispatch run.
///
/// State-of-charge bounds are stored in MWh, already resolved from the
/// configured fractions of [`energy_capacity_mwh`](Self::energy_capacity_mwh).
///
/// # Examples
///
/// ```
/// use bess_sim::sim::types::BatteryLimits;
///
/// let limits = BatteryLimits::try_new(10.0, 50.0, 0.97, 7.5, 47.5).unwrap();
/// assert_eq!(limits.usable_energy_mwh(), 40.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatteryLimits {
    /// Peak charge/discharge power per step (MW).
    pub power_limit_mw: f64,
    /// Nameplate energy capacity (MWh).
    pub energy_capacity_mwh: f64,
    /// One-way conversion efficiency (0..=1], applied on both legs.
    pub efficiency: f64,
    /// Floor of the state of charge (MWh).
    pub min_soc_mwh: f64,
    /// Ceiling of the state of charge (MWh).
    pub max_soc_mwh: f64,
}

impl BatteryLimits {
    /// Creates validated battery limits.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if efficiency is outside `(0, 1]`, power or
    /// capacity is not positive, or the state-of-charge window is empty or
    /// outside `[0, energy_capacity_mwh]`.
    pub fn try_new(
        power_limit_mw: f64,
        energy_capacity_mwh: f64,
        efficiency: f64,
        min_soc_mwh: f64,
        max_soc_mwh: f64,
    ) -> Result<Self, ConfigError> {
        let limits = Self {
            power_limit_mw,
            energy_capacity_mwh,
            efficiency,
            min_soc_mwh,
            max_soc_mwh,
        };
        limits.validate()?;
        Ok(limits)
    }

    /// Builds limits from state-of-charge fractions of the capacity.
    ///
    /// # Errors
    ///
    /// See [`BatteryLimits::try_new`].
    pub fn from_fractions(
        power_limit_mw: f64,
        energy_capacity_mwh: f64,
        efficiency: f64,
        min_soc_fraction: f64,
        max_soc_fraction: f64,
    ) -> Result<Self, ConfigError> {
        Self::try_new(
            power_limit_mw,
            energy_capacity_mwh,
            efficiency,
            min_soc_fraction * energy_capacity_mwh,
            max_soc_fraction * energy_capacity_mwh,
        )
    }

    /// Checks the invariants required before a dispatch run.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let all_finite = [
            self.power_limit_mw,
            self.energy_capacity_mwh,
            self.efficiency,
            self.min_soc_mwh,
            self.max_soc_mwh,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(ConfigError::new("battery", "all parameters must be finite"));
        }
        if !(self.efficiency > 0.0 && self.efficiency <= 1.0) {
            return Err(ConfigError::new(
                "battery.efficiency",
                format!("must be in (0, 1], got {}", self.efficiency),
            ));
        }
        if self.power_limit_mw <= 0.0 {
            return Err(ConfigError::new("battery.power_mw", "must be > 0"));
        }
        if self.energy_capacity_mwh <= 0.0 {
            return Err(ConfigError::new("battery.capacity_mwh", "must be > 0"));
        }
        if self.min_soc_mwh < 0.0 {
            return Err(ConfigError::new("battery.min_soc", "must be >= 0"));
        }
        if self.min_soc_mwh >= self.max_soc_mwh {
            return Err(ConfigError::new(
                "battery.min_soc",
                format!(
                    "must be < max state of charge ({} >= {})",
                    self.min_soc_mwh, self.max_soc_mwh
                ),
            ));
        }
        if self.max_soc_mwh > self.energy_capacity_mwh {
            return Err(ConfigError::new(
                "battery.max_soc",
                "must not exceed the energy capacity",
            ));
        }
        Ok(())
    }

    /// Returns a copy with a different power limit and unchanged energy bounds.
    pub fn with_power_limit(&self, power_limit_mw: f64) -> Self {
        Self {
            power_limit_mw,
            ..*self
        }
    }

    /// Returns a copy resized to `energy_capacity_mwh`, keeping the
    /// state-of-charge bounds at the same fractions of capacity.
    pub fn scaled_to_capacity(&self, energy_capacity_mwh: f64) -> Self {
        Self {
            energy_capacity_mwh,
            min_soc_mwh: self.min_soc_fraction() * energy_capacity_mwh,
            max_soc_mwh: self.max_soc_fraction() * energy_capacity_mwh,
            ..*self
        }
    }

    pub fn min_soc_fraction(&self) -> f64 {
        self.min_soc_mwh / self.energy_capacity_mwh
    }

    pub fn max_soc_fraction(&self) -> f64 {
        self.max_soc_mwh / self.energy_capacity_mwh
    }

    /// Energy between the floor and the ceiling (MWh).
    pub fn usable_energy_mwh(&self) -> f64 {
        self.max_soc_mwh - self.min_soc_mwh
    }
}

/// Outcome of one dispatch run over a complete slack series.
///
/// All trajectories have exactly one entry per input step.
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResult {
    /// State of charge after each step (MWh).
    pub state_of_charge_mwh: Vec<f64>,
    /// Net energy exchanged with the grid per step (MWh; positive = delivered
    /// to the grid, negative = drawn from the grid).
    pub energy_flow_mwh: Vec<f64>,
    /// Completed floor-to-ceiling excursions.
    pub full_cycle_count: usize,
    /// Step indices on which each full cycle completed, in order.
    pub cycle_completion_steps: Vec<usize>,
    /// Deficit the battery could not cover (MWh, >= 0).
    pub unmet_deficit_mwh: f64,
    /// Surplus the battery could not absorb (MWh, >= 0).
    pub unabsorbed_surplus_mwh: f64,
}

impl DispatchResult {
    /// Number of simulated steps.
    pub fn len(&self) -> usize {
        self.state_of_charge_mwh.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state_of_charge_mwh.is_empty()
    }

    /// Absolute mismatch between unmet deficit and unabsorbed surplus (MWh).
    pub fn imbalance_mwh(&self) -> f64 {
        (self.unmet_deficit_mwh - self.unabsorbed_surplus_mwh).abs()
    }

    /// Total energy delivered to the grid (MWh).
    pub fn energy_delivered_mwh(&self) -> f64 {
        self.energy_flow_mwh.iter().filter(|e| **e > 0.0).sum()
    }

    /// Total energy drawn from the grid, as a positive magnitude (MWh).
    pub fn energy_absorbed_mwh(&self) -> f64 {
        -self.energy_flow_mwh.iter().filter(|e| **e < 0.0).sum::<f64>()
    }
}

impl fmt::Display for DispatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} steps | cycles={} | unmet={:.3} MWh  unabsorbed={:.3} MWh  imbalance={:.3} MWh",
            self.len(),
            self.full_cycle_count,
            self.unmet_deficit_mwh,
            self.unabsorbed_surplus_mwh,
            self.imbalance_mwh(),
        )
    }
}
