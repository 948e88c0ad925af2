//! Compensation error types.

use bus::{AsFault, BusError, ExceptionKind};
use thiserror::Error;

/// Errors that can occur while compensating a fault.
///
/// Both propagate to the transport, which retries the whole compensation.
#[derive(Debug, Error)]
pub enum CompensationError {
    /// A repair transform named a field the event does not have.
    #[error("Event has no repairable field '{field}'")]
    UnknownField { field: String },

    /// The repaired event could not be republished.
    #[error("Republish failed: {0}")]
    Publish(#[from] BusError),
}

impl AsFault for CompensationError {
    fn exception_kind(&self) -> ExceptionKind {
        match self {
            CompensationError::UnknownField { .. } => ExceptionKind::InvalidOperation,
            CompensationError::Publish(e) => e.exception_kind(),
        }
    }
}

/// Convenience type alias for compensation results.
pub type Result<T> = std::result::Result<T, CompensationError>;
