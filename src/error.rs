//! Error types shared across the simulator, optimizer, and I/O layers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced to the caller. Every variant carries a human-readable message.
#[derive(Debug, Error)]
pub enum SimError {
    /// The slack input is missing, malformed, or contains non-finite values.
    #[error("input validation failed: {0}")]
    InputValidation(String),

    /// A series cannot be reshaped into whole aggregation periods.
    #[error("cannot split {len} steps into whole periods of {period} steps")]
    Shape { len: usize, period: usize },

    /// A battery or scenario parameter violates its constraints.
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("cannot access \"{}\": {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = SimError> = std::result::Result<T, E>;
