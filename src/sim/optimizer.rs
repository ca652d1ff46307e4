//! Peak-power and capacity sizing by bounded Nelder–Mead search.
//!
//! The objective is the absolute mismatch between unmet deficit and
//! unabsorbed surplus over the whole series. It is piecewise linear and not
//! smooth, so the search only ever compares candidates and never differentiates.

use std::cmp::Ordering;

use serde::Deserialize;
use tracing::{debug, info};

use super::dispatch;
use super::types::BatteryLimits;
use crate::error::Result;

/// Coordinate perturbation for the initial simplex.
const NONZERO_DELTA: f64 = 0.05;
const ZERO_DELTA: f64 = 0.000_25;
/// Constraint violation below which a point counts as feasible (MWh).
const FEASIBILITY_TOLERANCE: f64 = 1e-9;

/// Which parameters the search varies.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizeMode {
    /// Only the power limit; capacity stays at the initial guess.
    Power,
    /// Power limit and energy capacity together.
    #[default]
    PowerAndCapacity,
}

/// How the state-of-charge window follows a candidate capacity.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapacityBounds {
    /// The window is rescaled to the configured fractions of each candidate capacity.
    #[default]
    Scaled,
    /// The window stays fixed at the initial capacity and the candidate capacity
    /// is constrained to `min_soc_mwh <= capacity <= max_soc_mwh`. Capacity then
    /// has no effect on dispatch.
    Reference,
}

/// Search controls.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerSettings {
    pub mode: OptimizeMode,
    pub capacity_bounds: CapacityBounds,
    /// Hard cap on simplex iterations.
    pub max_iterations: usize,
    /// Hard cap on objective evaluations (dispatch runs).
    pub max_evaluations: usize,
    /// Absolute simplex size, in parameter units, at which the search stops.
    pub x_tolerance: f64,
    /// Absolute score spread, in MWh, at which the search stops.
    pub f_tolerance: f64,
}

impl Default for OptimizerSettings {
    fn default() -> Self {
        Self {
            mode: OptimizeMode::default(),
            capacity_bounds: CapacityBounds::default(),
            max_iterations: 400,
            max_evaluations: 800,
            x_tolerance: 1e-4,
            f_tolerance: 1e-4,
        }
    }
}

/// Starting point of the search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialGuess {
    pub power_mw: f64,
    pub capacity_mwh: f64,
}

/// Best parameters found by [`optimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    /// Optimized peak charge/discharge power (MW).
    pub peak_power_mw: f64,
    /// Optimized energy capacity (MWh).
    pub energy_capacity_mwh: f64,
    /// Whether the simplex collapsed within tolerance at a feasible point.
    pub converged: bool,
    /// Objective value at the returned point (MWh).
    pub objective_mwh: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Rank of a candidate: feasibility first, then objective.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Score {
    violation: f64,
    objective: f64,
}

impl Score {
    fn rank(&self, other: &Self) -> Ordering {
        self.violation
            .total_cmp(&other.violation)
            .then(self.objective.total_cmp(&other.objective))
    }

    fn beats(&self, other: &Self) -> bool {
        self.rank(other) == Ordering::Less
    }

    fn distance(&self, other: &Self) -> f64 {
        (self.violation - other.violation)
            .abs()
            .max((self.objective - other.objective).abs())
    }
}

#[derive(Debug, Clone)]
struct Vertex {
    x: Vec<f64>,
    score: Score,
}

/// Black-box sizing problem over one slack series.
///
/// Holds the series and the base battery limits; each evaluation runs a fresh
/// dispatch, so evaluations never share mutable state.
#[derive(Debug)]
pub struct ParameterOptimizer<'a> {
    slack_mw: &'a [f64],
    base: BatteryLimits,
    guess: InitialGuess,
    settings: OptimizerSettings,
    evaluations: usize,
}

impl<'a> ParameterOptimizer<'a> {
    /// Creates a sizing problem.
    ///
    /// # Errors
    ///
    /// Returns an error if `base` is invalid or the series is not finite.
    pub fn new(
        slack_mw: &'a [f64],
        base: BatteryLimits,
        guess: InitialGuess,
        settings: OptimizerSettings,
    ) -> Result<Self> {
        base.validate()?;
        dispatch::validate_series(slack_mw)?;
        Ok(Self {
            slack_mw,
            base,
            guess,
            settings,
            evaluations: 0,
        })
    }

    /// Battery limits the dispatch uses for a candidate `(power, capacity)`.
    pub fn candidate_limits(&self, power_mw: f64, capacity_mwh: f64) -> BatteryLimits {
        let limits = self.base.with_power_limit(power_mw);
        match (self.settings.mode, self.settings.capacity_bounds) {
            (OptimizeMode::PowerAndCapacity, CapacityBounds::Scaled) => {
                limits.scaled_to_capacity(capacity_mwh)
            }
            (OptimizeMode::PowerAndCapacity, CapacityBounds::Reference) => BatteryLimits {
                energy_capacity_mwh: capacity_mwh,
                ..limits
            },
            (OptimizeMode::Power, _) => limits,
        }
    }

    /// Objective at `(power, capacity)`: `|unmet deficit - unabsorbed surplus|` in MWh.
    pub fn objective(&self, power_mw: f64, capacity_mwh: f64) -> f64 {
        let limits = self.candidate_limits(power_mw, capacity_mwh);
        dispatch::run(self.slack_mw, &limits).imbalance_mwh()
    }

    /// Total inequality-constraint violation at `capacity` (MWh, 0 when feasible).
    fn violation(&self, capacity_mwh: f64) -> f64 {
        match (self.settings.mode, self.settings.capacity_bounds) {
            (OptimizeMode::PowerAndCapacity, CapacityBounds::Reference) => {
                (self.base.min_soc_mwh - capacity_mwh).max(0.0)
                    + (capacity_mwh - self.base.max_soc_mwh).max(0.0)
            }
            _ => 0.0,
        }
    }

    /// Maps a search point to `(power, capacity)`.
    fn unpack(&self, x: &[f64]) -> (f64, f64) {
        match self.settings.mode {
            OptimizeMode::Power => (x[0], self.guess.capacity_mwh),
            OptimizeMode::PowerAndCapacity => (x[0], x[1]),
        }
    }

    fn evaluate(&mut self, x: &[f64]) -> Score {
        self.evaluations += 1;
        let (power, capacity) = self.unpack(x);
        Score {
            violation: self.violation(capacity),
            objective: self.objective(power, capacity),
        }
    }

    fn vertex(&mut self, mut x: Vec<f64>) -> Vertex {
        project(&mut x);
        let score = self.evaluate(&x);
        Vertex { x, score }
    }

    fn budget_left(&self) -> bool {
        self.evaluations < self.settings.max_evaluations
    }

    /// Runs the search. Never fails: the best iterate is returned even when
    /// the iteration or evaluation cap stops the search early.
    pub fn run(&mut self) -> OptimizationResult {
        const REFLECT: f64 = 1.0;
        const EXPAND: f64 = 2.0;
        const CONTRACT: f64 = 0.5;
        const SHRINK: f64 = 0.5;

        let x0 = match self.settings.mode {
            OptimizeMode::Power => vec![self.guess.power_mw],
            OptimizeMode::PowerAndCapacity => vec![self.guess.power_mw, self.guess.capacity_mwh],
        };
        let n = x0.len();

        let mut simplex = Vec::with_capacity(n + 1);
        simplex.push(self.vertex(x0.clone()));
        for k in 0..n {
            let mut y = x0.clone();
            y[k] = if y[k] == 0.0 {
                ZERO_DELTA
            } else {
                (1.0 + NONZERO_DELTA) * y[k]
            };
            simplex.push(self.vertex(y));
        }
        sort(&mut simplex);

        let mut iterations = 0;
        let mut collapsed = false;

        while iterations < self.settings.max_iterations && self.budget_left() {
            if self.has_collapsed(&simplex) {
                collapsed = true;
                break;
            }
            iterations += 1;

            let worst = simplex[n].clone();
            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|v| v.x[j]).sum::<f64>() / n as f64)
                .collect();
            let along = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&worst.x)
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = self.vertex(along(REFLECT));
            let mut shrink = false;

            if reflected.score.beats(&simplex[0].score) {
                let expanded = self.vertex(along(REFLECT * EXPAND));
                simplex[n] = if expanded.score.beats(&reflected.score) {
                    expanded
                } else {
                    reflected
                };
            } else if reflected.score.beats(&simplex[n - 1].score) {
                simplex[n] = reflected;
            } else if reflected.score.beats(&worst.score) {
                let outside = self.vertex(along(CONTRACT * REFLECT));
                if outside.score.rank(&reflected.score) != Ordering::Greater {
                    simplex[n] = outside;
                } else {
                    shrink = true;
                }
            } else {
                let inside = self.vertex(along(-CONTRACT));
                if inside.score.beats(&worst.score) {
                    simplex[n] = inside;
                } else {
                    shrink = true;
                }
            }

            if shrink {
                let best = simplex[0].x.clone();
                for vertex in simplex.iter_mut().skip(1) {
                    let x: Vec<f64> = best
                        .iter()
                        .zip(&vertex.x)
                        .map(|(b, v)| b + SHRINK * (v - b))
                        .collect();
                    *vertex = self.vertex(x);
                }
            }

            sort(&mut simplex);
            debug!(
                iteration = iterations,
                evaluations = self.evaluations,
                best_objective_mwh = simplex[0].score.objective,
                best_violation_mwh = simplex[0].score.violation,
                "simplex step"
            );
        }

        let best = &simplex[0];
        let (peak_power_mw, energy_capacity_mwh) = self.unpack(&best.x);
        let converged = collapsed && best.score.violation <= FEASIBILITY_TOLERANCE;

        info!(
            peak_power_mw,
            energy_capacity_mwh,
            objective_mwh = best.score.objective,
            converged,
            iterations,
            evaluations = self.evaluations,
            "optimizer finished"
        );

        OptimizationResult {
            peak_power_mw,
            energy_capacity_mwh,
            converged,
            objective_mwh: best.score.objective,
            iterations,
            evaluations: self.evaluations,
        }
    }

    fn has_collapsed(&self, simplex: &[Vertex]) -> bool {
        let best = &simplex[0];
        let x_spread = simplex[1..]
            .iter()
            .flat_map(|v| v.x.iter().zip(&best.x).map(|(a, b)| (a - b).abs()))
            .fold(0.0, f64::max);
        let f_spread = simplex[1..]
            .iter()
            .map(|v| v.score.distance(&best.score))
            .fold(0.0, f64::max);
        x_spread <= self.settings.x_tolerance && f_spread <= self.settings.f_tolerance
    }
}

/// Clips a point onto the box `power >= 0`, `capacity >= 0`.
fn project(x: &mut [f64]) {
    for v in x {
        *v = v.max(0.0);
    }
}

fn sort(simplex: &mut [Vertex]) {
    simplex.sort_by(|a, b| a.score.rank(&b.score));
}

/// Sizes the battery for `slack_mw`, starting from `guess`.
///
/// # Errors
///
/// Returns an error only for invalid inputs; non-convergence is reported
/// through [`OptimizationResult::converged`].
pub fn optimize(
    slack_mw: &[f64],
    base: &BatteryLimits,
    guess: InitialGuess,
    settings: OptimizerSettings,
) -> Result<OptimizationResult> {
    Ok(ParameterOptimizer::new(slack_mw, *base, guess, settings)?.run())
}
