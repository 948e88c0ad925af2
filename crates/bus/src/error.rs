//! Bus error types.

use thiserror::Error;

use crate::fault::{AsFault, ExceptionKind};

/// Errors that can occur when talking to the bus.
#[derive(Debug, Error)]
pub enum BusError {
    /// The broker refused or lost a publish.
    #[error("Publish failed: {0}")]
    PublishFailed(String),

    /// A fault envelope was built without any exception records.
    #[error("Fault envelope must carry at least one exception")]
    EmptyFault,

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl AsFault for BusError {
    fn exception_kind(&self) -> ExceptionKind {
        match self {
            BusError::PublishFailed(_) => ExceptionKind::Transport,
            BusError::EmptyFault => ExceptionKind::InvalidOperation,
            BusError::Serialization(_) => ExceptionKind::InvalidOperation,
        }
    }
}

/// Result type for bus operations.
pub type Result<T> = std::result::Result<T, BusError>;
