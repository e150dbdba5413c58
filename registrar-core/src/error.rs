//! Error types for REGISTRAR operations

use std::fmt;
use thiserror::Error;

/// Capability a module member can provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Producer,
    Acceptor,
    Dispatch,
    Supply,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Producer => "producer",
            Capability::Acceptor => "acceptor",
            Capability::Dispatch => "dispatch entry point",
            Capability::Supply => "supply entry point",
        };
        f.write_str(name)
    }
}

/// A per-item failure recorded by a pipeline stage.
///
/// Every variant is recoverable at the granularity of one marker, one
/// component or one module: the stage reports it and moves on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistrarError {
    #[error("Invalid metadata in {module}: {reason}")]
    MetadataParse { module: String, reason: String },

    #[error("Ambiguous {capability} in {module}: {}", candidates.join(", "))]
    AmbiguousCapability {
        module: String,
        capability: Capability,
        candidates: Vec<String>,
    },

    #[error("Component {module} declares neither a producer nor an acceptor")]
    MissingCapability { module: String },

    #[error("Cannot rewrite {module}: {reason}")]
    BinaryRewrite { module: String, reason: String },

    #[error("I/O error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl RegistrarError {
    pub fn metadata(module: impl fmt::Display, reason: impl Into<String>) -> Self {
        RegistrarError::MetadataParse {
            module: module.to_string(),
            reason: reason.into(),
        }
    }

    pub fn rewrite(module: impl fmt::Display, reason: impl Into<String>) -> Self {
        RegistrarError::BinaryRewrite {
            module: module.to_string(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl fmt::Display, reason: impl fmt::Display) -> Self {
        RegistrarError::Io {
            path: path.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Module type or entry path the error is about.
    pub fn subject(&self) -> &str {
        match self {
            RegistrarError::MetadataParse { module, .. }
            | RegistrarError::AmbiguousCapability { module, .. }
            | RegistrarError::MissingCapability { module }
            | RegistrarError::BinaryRewrite { module, .. } => module,
            RegistrarError::Io { path, .. } => path,
        }
    }
}

/// Result type alias for single-item stage operations.
pub type RegistrarResult<T> = Result<T, RegistrarError>;

/// Failure of a whole run: every error recorded before a checkpoint.
///
/// The message is the newline-joined list of individual messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateError {
    pub stage: &'static str,
    pub errors: Vec<RegistrarError>,
}

impl fmt::Display for AggregateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("\n")?;
            }
            write!(f, "{}", error)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

// =============================================================================
// TESTS
// =============================================================================
