//! Retry error types.

use std::fmt;

use thiserror::Error;

/// Terminal failure of a retried operation.
///
/// `T` and `E` are the success and error types of the operation being retried.
#[derive(Debug, Error)]
pub enum RetryError<T, E> {
    /// The predicate declined to retry a failed attempt.
    #[error("Non-retryable failure after {attempts} attempt(s): {source}")]
    Rejected { attempts: u32, source: E },

    /// A bounded policy ran out of attempts. Carries the last outcome, which
    /// may be an `Ok` the predicate still considered retryable.
    #[error("Retries exhausted after {attempts} attempt(s): {}", describe(.last))]
    Exhausted { attempts: u32, last: Result<T, E> },

    /// The cancellation token fired before or between attempts.
    #[error("Retry cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

fn describe<T, E: fmt::Display>(last: &Result<T, E>) -> String {
    match last {
        Err(error) => error.to_string(),
        Ok(_) => "result still retryable".to_string(),
    }
}

impl<T, E> RetryError<T, E> {
    /// Returns the number of attempts made before giving up.
    pub fn attempts(&self) -> u32 {
        match self {
            RetryError::Rejected { attempts, .. }
            | RetryError::Exhausted { attempts, .. }
            | RetryError::Cancelled { attempts } => *attempts,
        }
    }

    /// Returns true if the retry loop stopped because of cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RetryError::Cancelled { .. })
    }

    /// Returns the error of the final attempt, if there was one.
    pub fn into_error(self) -> Option<E> {
        match self {
            RetryError::Rejected { source, .. } => Some(source),
            RetryError::Exhausted { last, .. } => last.err(),
            RetryError::Cancelled { .. } => None,
        }
    }
}
