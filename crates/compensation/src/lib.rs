//! Fault compensation for messages that failed downstream.
//!
//! When a consumer fails on an event, the transport delivers a
//! [`FaultEnvelope`](bus::FaultEnvelope) carrying the event and the
//! exceptions it raised. The [`FaultCompensator`] handles it in three steps:
//! 1. Classify the first exception against a closed whitelist
//! 2. Repair the event in place and republish it under its own key
//! 3. Otherwise escalate to the diagnostic sink and stop
//!
//! Unknown failures are never repaired.

pub mod classifier;
pub mod consumer;
pub mod error;
pub mod repair;

pub use classifier::{CompensationDecision, DEFAULT_FALLBACK_MODEL, ExceptionClassifier};
pub use consumer::{CompensationOutcome, FaultCompensator};
pub use error::{CompensationError, Result};
pub use repair::RepairTransform;
