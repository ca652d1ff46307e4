use std::path::PathBuf;

use clap::Parser;

/// Battery dispatch simulator with power and capacity sizing.
///
/// If neither `--scenario` nor `--preset` is given, the baseline preset is used.
#[derive(Debug, Parser)]
#[command(author, version, about)]
#[must_use]
pub struct Args {
    /// Load the scenario from a TOML file.
    #[clap(long, conflicts_with = "preset")]
    pub scenario: Option<PathBuf>,

    /// Use a built-in preset (baseline, year, balanced).
    #[clap(long)]
    pub preset: Option<String>,

    /// CSV file with a `Slack` column; overrides `[input] slack_csv`.
    #[clap(long)]
    pub slack_csv: Option<PathBuf>,

    /// Peak power in MW; overrides the CSV and scenario value.
    #[clap(long)]
    pub power_mw: Option<f64>,

    /// Energy capacity in MWh; overrides the CSV and scenario value.
    #[clap(long)]
    pub capacity_mwh: Option<f64>,

    /// Skip the sizing search and dispatch with the given parameters.
    #[clap(long)]
    pub no_optimize: bool,

    /// Override the synthetic slack seed.
    #[clap(long)]
    pub seed: Option<u64>,

    /// Write the per-step trajectory to this CSV file.
    #[clap(long)]
    pub output: Option<PathBuf>,
}
