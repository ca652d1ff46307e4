//! Full-cycle detection over a state-of-charge trajectory.

/// Phase of the cycle detector.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    /// No floor contact since the last counted cycle.
    #[default]
    Idle,
    /// The battery has bottomed out and is waiting to reach the ceiling.
    InDischargeExcursion,
}

/// Counts floor-to-ceiling excursions of the state of charge.
///
/// A cycle is counted only on the upward leg: the battery must first touch
/// the floor, then reach the ceiling. Reaching the ceiling without a prior
/// floor contact counts nothing.
///
/// # Examples
///
/// ```
/// use bess_sim::sim::cycle::CycleCounter;
///
/// let mut counter = CycleCounter::new();
/// assert!(!counter.observe(9.0, 1.0, 9.0)); // ceiling first: ignored
/// assert!(!counter.observe(1.0, 1.0, 9.0)); // floor: excursion starts
/// assert!(counter.observe(9.0, 1.0, 9.0)); // ceiling: one cycle
/// assert_eq!(counter.full_cycles(), 1);
/// ```
#[derive(Debug, Default, Clone)]
pub struct CycleCounter {
    state: CycleState,
    full_cycles: usize,
}

impl CycleCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds the state of charge left by one step.
    ///
    /// # Returns
    ///
    /// `true` if this observation completed a full cycle.
    pub fn observe(&mut self, soc_mwh: f64, min_soc_mwh: f64, max_soc_mwh: f64) -> bool {
        if soc_mwh >= max_soc_mwh {
            if self.state == CycleState::InDischargeExcursion {
                self.full_cycles += 1;
                self.state = CycleState::Idle;
                return true;
            }
        } else if soc_mwh <= min_soc_mwh {
            self.state = CycleState::InDischargeExcursion;
        }
        false
    }

    pub fn state(&self) -> CycleState {
        self.state
    }

    pub fn full_cycles(&self) -> usize {
        self.full_cycles
    }
}
