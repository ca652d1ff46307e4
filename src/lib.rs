//! Battery energy storage dispatch simulator with power and capacity sizing.

pub mod cli;
pub mod config;
pub mod error;
/// CSV input and output.
pub mod io;
/// Averaged period profiles and monthly totals.
pub mod report;
pub mod runner;
/// Dispatch simulation, cycle counting, KPIs, and the sizing search.
pub mod sim;
pub mod synthetic;

pub use error::{Result, SimError};
