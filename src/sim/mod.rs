//! Battery dispatch simulation and sizing.

/// Full-cycle detection state machine.
pub mod cycle;
/// Greedy per-step dispatch against a slack series.
pub mod dispatch;
pub mod kpi;
/// Power and capacity sizing.
pub mod optimizer;
pub mod types;

pub use dispatch::simulate;
pub use optimizer::{OptimizationResult, optimize};
pub use types::{BatteryLimits, DispatchResult};
