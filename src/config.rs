//! TOML-based scenario configuration and preset definitions.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::sim::optimizer::{CapacityBounds, OptimizeMode, OptimizerSettings};
use crate::sim::types::BatteryLimits;

/// Top-level scenario configuration parsed from TOML.
///
/// All fields have defaults matching the baseline scenario. Load from
/// TOML with [`ScenarioConfig::from_toml_file`] or use
/// [`ScenarioConfig::baseline`] for the built-in default.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Where the slack series comes from.
    #[serde(default)]
    pub input: InputConfig,
    /// Battery parameters and state-of-charge window.
    #[serde(default)]
    pub battery: BatteryConfig,
    /// Power/capacity sizing search.
    #[serde(default)]
    pub optimizer: OptimizerConfig,
    /// Aggregation periods.
    #[serde(default)]
    pub report: ReportConfig,
    /// Synthetic slack used when no CSV input is given.
    #[serde(default)]
    pub synthetic: SyntheticConfig,
}

/// Slack input source.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InputConfig {
    /// CSV file with a `Slack` column. Relative paths resolve against the
    /// working directory.
    pub slack_csv: Option<PathBuf>,
}

/// Battery parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatteryConfig {
    /// Peak charge/discharge power (MW).
    pub power_mw: f64,
    /// Total energy capacity (MWh).
    pub capacity_mwh: f64,
    /// Conversion efficiency (0.0–1.0], applied on each leg.
    pub efficiency: f64,
    /// State-of-charge floor as a fraction of capacity.
    pub min_soc_fraction: f64,
    /// State-of-charge ceiling as a fraction of capacity.
    pub max_soc_fraction: f64,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            power_mw: 10.0,
            capacity_mwh: 50.0,
            efficiency: 0.97,
            min_soc_fraction: 0.15,
            max_soc_fraction: 0.95,
        }
    }
}

impl BatteryConfig {
    /// Resolves absolute battery limits.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the resolved limits are invalid.
    pub fn limits(&self) -> Result<BatteryLimits, ConfigError> {
        BatteryLimits::from_fractions(
            self.power_mw,
            self.capacity_mwh,
            self.efficiency,
            self.min_soc_fraction,
            self.max_soc_fraction,
        )
    }
}

/// Sizing search parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OptimizerConfig {
    /// Run the sizing search before the canonical dispatch.
    pub enabled: bool,
    /// `"power"` or `"power_and_capacity"`.
    pub mode: OptimizeMode,
    /// `"scaled"` or `"reference"`.
    pub capacity_bounds: CapacityBounds,
    pub max_iterations: usize,
    pub max_evaluations: usize,
    pub x_tolerance: f64,
    pub f_tolerance: f64,
}

impl Default for OptimizerConfig {
    fn default() -> Self {
        let settings = OptimizerSettings::default();
        Self {
            enabled: true,
            mode: settings.mode,
            capacity_bounds: settings.capacity_bounds,
            max_iterations: settings.max_iterations,
            max_evaluations: settings.max_evaluations,
            x_tolerance: settings.x_tolerance,
            f_tolerance: settings.f_tolerance,
        }
    }
}

impl OptimizerConfig {
    pub fn settings(&self) -> OptimizerSettings {
        OptimizerSettings {
            mode: self.mode,
            capacity_bounds: self.capacity_bounds,
            max_iterations: self.max_iterations,
            max_evaluations: self.max_evaluations,
            x_tolerance: self.x_tolerance,
            f_tolerance: self.f_tolerance,
        }
    }
}

/// Aggregation periods.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReportConfig {
    /// Length of the averaged profile (steps), 24 for a daily profile.
    pub period_steps: usize,
    /// Steps per month when the input carries no timestamps.
    pub steps_per_month: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            period_steps: 24,
            steps_per_month: 24 * 30,
        }
    }
}

/// Synthetic slack generator parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SyntheticConfig {
    /// Number of days to generate.
    pub days: usize,
    /// Steps per day (24 for hourly data).
    pub steps_per_day: usize,
    /// Mean slack (MW; positive leans towards deficit).
    pub mean_mw: f64,
    /// Daily sinusoid amplitude (MW).
    pub amplitude_mw: f64,
    /// Phase offset (radians).
    pub phase_rad: f64,
    /// Gaussian noise standard deviation (MW).
    pub noise_std_mw: f64,
    /// Random seed.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            days: 30,
            steps_per_day: 24,
            mean_mw: 0.0,
            amplitude_mw: 8.0,
            phase_rad: 0.0,
            noise_std_mw: 1.5,
            seed: 42,
        }
    }
}

/// Configuration error with field path and constraint description.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.efficiency"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl ScenarioConfig {
    /// Returns the baseline scenario: one synthetic month at the default battery.
    pub fn baseline() -> Self {
        Self::default()
    }

    /// Returns a full synthetic year leaning towards surplus.
    pub fn year() -> Self {
        Self {
            synthetic: SyntheticConfig {
                days: 365,
                mean_mw: -0.5,
                amplitude_mw: 10.0,
                noise_std_mw: 2.0,
                ..SyntheticConfig::default()
            },
            ..Self::default()
        }
    }

    /// Returns a noise-free symmetric series that a lossless battery can balance.
    pub fn balanced() -> Self {
        Self {
            battery: BatteryConfig {
                efficiency: 1.0,
                ..BatteryConfig::default()
            },
            synthetic: SyntheticConfig {
                days: 7,
                noise_std_mw: 0.0,
                ..SyntheticConfig::default()
            },
            ..Self::default()
        }
    }

    /// Available preset names.
    pub const PRESETS: &[&str] = &["baseline", "year", "balanced"];

    /// Loads a scenario from a named preset.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the preset name is unknown.
    pub fn from_preset(name: &str) -> Result<Self, ConfigError> {
        match name {
            "baseline" => Ok(Self::baseline()),
            "year" => Ok(Self::year()),
            "balanced" => Ok(Self::balanced()),
            _ => Err(ConfigError::new(
                "preset",
                format!(
                    "unknown preset \"{name}\", available: {}",
                    Self::PRESETS.join(", ")
                ),
            )),
        }
    }

    /// Parses a scenario from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the file cannot be read or the TOML is invalid.
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| {
            ConfigError::new("scenario", format!("cannot read \"{}\": {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parses a scenario from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if the TOML is invalid or contains unknown fields.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|e| ConfigError::new("toml", e.to_string()))
    }

    /// Validates all fields and returns a list of errors.
    ///
    /// Returns an empty vector if configuration is valid.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let bat = &self.battery;
        if !(bat.power_mw.is_finite() && bat.power_mw > 0.0) {
            errors.push(ConfigError::new("battery.power_mw", "must be > 0"));
        }
        if !(bat.capacity_mwh.is_finite() && bat.capacity_mwh > 0.0) {
            errors.push(ConfigError::new("battery.capacity_mwh", "must be > 0"));
        }
        if !(bat.efficiency > 0.0 && bat.efficiency <= 1.0) {
            errors.push(ConfigError::new(
                "battery.efficiency",
                format!("must be in (0.0, 1.0], got {}", bat.efficiency),
            ));
        }
        for (field, value) in [
            ("battery.min_soc_fraction", bat.min_soc_fraction),
            ("battery.max_soc_fraction", bat.max_soc_fraction),
        ] {
            if !(0.0..=1.0).contains(&value) {
                errors.push(ConfigError::new(field, "must be in [0.0, 1.0]"));
            }
        }
        if bat.min_soc_fraction >= bat.max_soc_fraction {
            errors.push(ConfigError::new(
                "battery.min_soc_fraction",
                "must be < battery.max_soc_fraction",
            ));
        }

        let opt = &self.optimizer;
        if opt.max_iterations == 0 {
            errors.push(ConfigError::new("optimizer.max_iterations", "must be > 0"));
        }
        if opt.max_evaluations == 0 {
            errors.push(ConfigError::new("optimizer.max_evaluations", "must be > 0"));
        }
        if !(opt.x_tolerance.is_finite() && opt.x_tolerance >= 0.0) {
            errors.push(ConfigError::new("optimizer.x_tolerance", "must be >= 0"));
        }
        if !(opt.f_tolerance.is_finite() && opt.f_tolerance >= 0.0) {
            errors.push(ConfigError::new("optimizer.f_tolerance", "must be >= 0"));
        }

        let rep = &self.report;
        if rep.period_steps == 0 {
            errors.push(ConfigError::new("report.period_steps", "must be > 0"));
        }
        if rep.steps_per_month == 0 {
            errors.push(ConfigError::new("report.steps_per_month", "must be > 0"));
        }

        let syn = &self.synthetic;
        if syn.days == 0 {
            errors.push(ConfigError::new("synthetic.days", "must be > 0"));
        }
        if syn.steps_per_day == 0 {
            errors.push(ConfigError::new("synthetic.steps_per_day", "must be > 0"));
        }
        if syn.noise_std_mw < 0.0 {
            errors.push(ConfigError::new("synthetic.noise_std_mw", "must be >= 0"));
        }

        errors
    }
}
