//! Error types for ML state operations.
//!
//! All errors are surfaced to the caller. Nothing is retried internally.

use thiserror::Error;

/// Errors reported by a delegated model handle.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Model call '{op}' failed: {message}")]
    Call { op: String, message: String },

    #[error("Model construction failed: {0}")]
    Construction(String),

    #[error("Model I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Other(String),
}

impl ModelError {
    /// Convenience constructor for a failed named operation.
    pub fn call(op: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Call { op: op.into(), message: message.into() }
    }
}

/// Errors that can occur on a shared ML state.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("State has been terminated")]
    Terminated,

    #[error("State construction failed: {0}")]
    Construction(String),

    #[error("Training via write failed for a batch of {batch_size} records: {source}")]
    TrainingFailed {
        batch_size: usize,
        #[source]
        source: ModelError,
    },

    #[error("Delegated model call failed: {0}")]
    Delegate(#[from] ModelError),

    #[error("Unsupported format version of state snapshot: {0}")]
    UnsupportedVersion(u8),

    #[error("Corrupt state snapshot: {0}")]
    Corrupt(String),

    #[error("Snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode state configuration: {0}")]
    Encode(String),

    #[error("State '{0}' not found")]
    NotFound(String),

    #[error("State '{name}' is a {found}, not an ML state")]
    WrongType { name: String, found: &'static str },

    #[error("State '{0}' already exists")]
    AlreadyExists(String),
}

impl StateError {
    /// Returns true if a snapshot was rejected because of its content.
    pub fn is_corruption(&self) -> bool {
        matches!(self, Self::Corrupt(_) | Self::UnsupportedVersion(_))
    }

    /// Returns true if this error reflects a caller-side lookup problem.
    pub fn is_lookup(&self) -> bool {
        matches!(self, Self::NotFound(_) | Self::WrongType { .. })
    }
}
