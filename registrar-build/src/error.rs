//! Top-level error for a registrar run.

use registrar_core::{AggregateError, ConfigError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A checkpoint found recorded errors. Displays as the newline-joined
    /// individual messages.
    #[error("{0}")]
    Aborted(#[from] AggregateError),

    #[error("Failed to write run summary {path}: {reason}")]
    Summary { path: String, reason: String },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

impl BuildError {
    /// Recorded errors behind an aborted run; empty for other failures.
    pub fn recorded(&self) -> &[registrar_core::RegistrarError] {
        match self {
            BuildError::Aborted(agg) => &agg.errors,
            _ => &[],
        }
    }
}

/// Result type alias for run-level operations.
pub type BuildResult<T> = Result<T, BuildError>;
