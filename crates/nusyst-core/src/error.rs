//! Error types for nusyst

use thiserror::Error;

use crate::types::ParameterId;

/// nusyst error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Unrecognized or missing required setting. Fatal at setup.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A relative data path could not be resolved (no installation root configured).
    #[error("Invalid data path: {0}")]
    InvalidDataPath(String),

    /// An applicable event lacks the particles needed to compute its kinematics.
    #[error("Incomplete event: {0}")]
    IncompleteEvent(String),

    /// A response does not carry the registry-declared number of entries.
    #[error("Expected {expected} responses from parameter {id}, but found {actual}")]
    ResponseCardinalityMismatch {
        /// Offending parameter.
        id: ParameterId,
        /// Count declared by the registry.
        expected: usize,
        /// Count actually produced.
        actual: usize,
    },

    /// A parameter with the same name or id is already registered.
    #[error("Duplicate parameter: {0}")]
    DuplicateParameter(String),

    /// No parameter with this name or id is registered.
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
