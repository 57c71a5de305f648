//! Error types for xflow
//!
//! Centralized error handling using thiserror, plus the wire-level
//! error taxonomy carried in result envelopes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// All error types that can occur in xflow
#[derive(Debug, Error)]
pub enum XflowError {
    /// Tool name not present in the registry
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Program alias not present in the program registry
    #[error("Unknown program: {0}")]
    UnknownProgram(String),

    /// Required parameter absent from the request arguments
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    /// Supplied argument does not match the declared parameter type
    #[error("Type mismatch for parameter '{param}': expected {expected}, got {actual}")]
    TypeMismatch {
        param: String,
        expected: String,
        actual: String,
    },

    /// Project resource already has a request in flight
    #[error("Resource busy: {0}")]
    Busy(String),

    /// Registry construction error (duplicate registration, bad descriptor)
    #[error("Registry error: {0}")]
    Registry(String),

    /// Program registry configuration error
    #[error("Program config error: {0}")]
    ProgramConfig(String),

    /// Internal invariant breach or fault from a deeper layer
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for xflow operations
pub type Result<T> = std::result::Result<T, XflowError>;

/// Machine-readable failure kind carried in every failed result envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    UnknownTool,
    UnknownProgram,
    MissingParameter,
    TypeMismatch,
    SpawnFailure,
    Timeout,
    Cancelled,
    Busy,
    NonZeroExit,
    InternalFault,
}

impl XflowError {
    /// Classify this error for the result envelope.
    ///
    /// Lookup and validation errors map one-to-one; everything else is an
    /// internal fault and must not leak details to the caller.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::UnknownTool(_) => ErrorKind::UnknownTool,
            Self::UnknownProgram(_) => ErrorKind::UnknownProgram,
            Self::MissingParameter(_) => ErrorKind::MissingParameter,
            Self::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Self::Busy(_) => ErrorKind::Busy,
            Self::Registry(_) | Self::ProgramConfig(_) | Self::Internal(_) | Self::Io(_) | Self::Json(_) => {
                ErrorKind::InternalFault
            }
        }
    }
}
