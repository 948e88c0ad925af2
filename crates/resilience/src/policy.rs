//! Retry policy configuration and execution.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::RetryError;

/// The shape of a retry policy.
///
/// Attempt lifecycle shared by both shapes:
/// ```text
/// Idle ──► Attempting ──┬──► Success
///              ▲        ├──► NonRetryable            (predicate declines)
///              │        ├──► Exhausted               (Bounded only)
///              │        ├──► Cancelled               (token fired)
///              └─ wait ◄┴─── Retryable
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryKind {
    /// At most `max_attempts` attempts, including the first.
    Bounded { max_attempts: u32 },

    /// No attempt ceiling; only cancellation stops the loop.
    Unbounded,
}

impl RetryKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryKind::Bounded { .. } => "bounded",
            RetryKind::Unbounded => "unbounded",
        }
    }
}

impl fmt::Display for RetryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides whether the outcome of an attempt should be retried.
///
/// An `Ok` outcome the predicate rejects is a success; an `Err` outcome the
/// predicate rejects is a non-retryable failure. Returning `true` for an `Ok`
/// marks a "not ready yet" result, which is retried like a transient error.
pub trait RetryPredicate<T, E>: Send + Sync {
    fn should_retry(&self, outcome: &Result<T, E>) -> bool;
}

impl<T, E, F> RetryPredicate<T, E> for F
where
    F: Fn(&Result<T, E>) -> bool + Send + Sync,
{
    fn should_retry(&self, outcome: &Result<T, E>) -> bool {
        self(outcome)
    }
}

/// Retries every error and accepts every success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryOnError;

impl<T, E> RetryPredicate<T, E> for RetryOnError {
    fn should_retry(&self, outcome: &Result<T, E>) -> bool {
        outcome.is_err()
    }
}

/// Immutable retry configuration.
///
/// Built once at startup and shared read-only (typically behind an `Arc`)
/// by every call site that references it.
#[derive(Clone)]
pub struct RetryPolicy<P = RetryOnError> {
    kind: RetryKind,
    interval: Duration,
    predicate: P,
}

impl RetryPolicy<RetryOnError> {
    /// Creates a bounded policy with at most `max_attempts` attempts.
    ///
    /// A value of zero is treated as one: the operation always runs once.
    pub fn bounded(max_attempts: u32, interval: Duration) -> Self {
        Self {
            kind: RetryKind::Bounded {
                max_attempts: max_attempts.max(1),
            },
            interval,
            predicate: RetryOnError,
        }
    }

    /// Creates a bounded policy that retries `retry_limit` times after the
    /// first attempt.
    pub fn retries(retry_limit: u32, interval: Duration) -> Self {
        Self::bounded(retry_limit.saturating_add(1), interval)
    }

    /// Creates an unbounded policy.
    pub fn unbounded(interval: Duration) -> Self {
        Self {
            kind: RetryKind::Unbounded,
            interval,
            predicate: RetryOnError,
        }
    }
}

impl<P> RetryPolicy<P> {
    /// Replaces the retry predicate.
    pub fn retry_if<Q>(self, predicate: Q) -> RetryPolicy<Q> {
        RetryPolicy {
            kind: self.kind,
            interval: self.interval,
            predicate,
        }
    }

    /// Returns the policy shape.
    pub fn kind(&self) -> RetryKind {
        self.kind
    }

    /// Returns the fixed wait between attempts.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Returns the attempt ceiling, or `None` for unbounded policies.
    pub fn max_attempts(&self) -> Option<u32> {
        match self.kind {
            RetryKind::Bounded { max_attempts } => Some(max_attempts),
            RetryKind::Unbounded => None,
        }
    }

    /// Returns the retry predicate.
    pub fn predicate(&self) -> &P {
        &self.predicate
    }

    /// Runs `op` until the predicate accepts its outcome, the policy gives up,
    /// or `cancel` fires.
    ///
    /// `op` receives the 1-based attempt number. The wait between attempts is
    /// a timer, not a busy loop, and is cut short by cancellation; no attempt
    /// starts after the token has fired.
    #[tracing::instrument(skip_all, fields(kind = %self.kind))]
    pub async fn execute<T, E, F, Fut>(
        &self,
        cancel: &CancellationToken,
        mut op: F,
    ) -> Result<T, RetryError<T, E>>
    where
        P: RetryPredicate<T, E>,
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempts: u32 = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(RetryError::Cancelled { attempts });
            }

            attempts += 1;
            metrics::counter!("retry_attempts_total", "kind" => self.kind.as_str()).increment(1);
            let outcome = op(attempts).await;

            if !self.predicate.should_retry(&outcome) {
                if outcome.is_err() {
                    tracing::debug!(attempts, "attempt failed with a non-retryable outcome");
                }
                return outcome.map_err(|source| RetryError::Rejected { attempts, source });
            }

            if let RetryKind::Bounded { max_attempts } = self.kind
                && attempts >= max_attempts
            {
                tracing::warn!(attempts, "retry attempts exhausted");
                return Err(RetryError::Exhausted {
                    attempts,
                    last: outcome,
                });
            }

            tracing::debug!(
                attempts,
                interval_ms = self.interval.as_millis() as u64,
                "attempt not successful, retrying"
            );

            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    tracing::info!(attempts, "retry cancelled");
                    return Err(RetryError::Cancelled { attempts });
                }
                () = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}

impl<P> fmt::Debug for RetryPolicy<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("kind", &self.kind)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}
