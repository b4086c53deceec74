//! Error types for the layout optimizer.

use thiserror::Error;

/// Result type alias for layout operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building, editing or evaluating a layout.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid box or part geometry.
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Envelope cannot be constructed from the given parameters.
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(String),

    /// A part definition is malformed.
    #[error("Invalid part {id}: {reason}")]
    InvalidPart {
        /// Part identifier.
        id: String,
        /// What is wrong with it.
        reason: String,
    },

    /// Configuration or action parameter error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An action referenced a component that does not exist.
    #[error("Unknown component: {0}")]
    UnknownComponent(String),

    /// The external physics solver failed.
    #[error("Solver failed: {0}")]
    Solver(String),

    /// The external planner failed to produce actions.
    #[error("Planner failed: {0}")]
    Planner(String),

    /// Serialization error.
    #[cfg(feature = "serde")]
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Shorthand for an [`Error::InvalidPart`].
    pub fn invalid_part(id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPart {
            id: id.into(),
            reason: reason.into(),
        }
    }
}
