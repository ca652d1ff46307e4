//! Tabular input and output.

/// CSV export of dispatch trajectories.
pub mod export;
/// CSV import of slack series.
pub mod input;
