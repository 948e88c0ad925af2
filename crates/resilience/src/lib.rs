//! Retry policies for message consumption and dependency access.
//!
//! Two policy shapes share one configuration type:
//! - **Bounded**: a fixed number of attempts separated by a fixed interval,
//!   used when consuming messages so transient failures do not loop forever.
//! - **Unbounded**: retries at a fixed interval until the operation succeeds
//!   or the caller's [`CancellationToken`] fires, used while waiting for a
//!   dependency to come up.
//!
//! The [`probe`] module provides the dependency probe port and its HTTP
//! implementation.

pub mod error;
pub mod policy;
pub mod probe;

pub use error::RetryError;
pub use policy::{RetryKind, RetryOnError, RetryPolicy, RetryPredicate};
pub use probe::{
    DependencyProbe, HttpProbe, NotReadyPredicate, ProbeError, ProbeStatus, wait_for_dependency,
};
pub use tokio_util::sync::CancellationToken;
