//! Transport boundary for the fault-compensation node.
//!
//! The real broker owns framing, acknowledgement and persistence. This crate
//! holds the types that cross that boundary and an in-process stand-in:
//! - [`FaultEnvelope`] / [`FaultRecord`]: a failed message plus the ordered
//!   exceptions its consumption raised
//! - [`EventPublisher`]: the outbound publish port, with [`InMemoryBus`]
//! - [`DiagnosticSink`]: the fire-and-forget observability sink
//! - [`Consumer`] and [`ReceiveEndpoint`]: delivery under a bounded retry
//!   policy, publishing a fault envelope when retries run out

pub mod consumer;
pub mod diagnostics;
pub mod endpoint;
pub mod error;
pub mod fault;
pub mod memory;
pub mod publisher;

pub use consumer::Consumer;
pub use diagnostics::{
    DiagnosticKind, DiagnosticRecord, DiagnosticSink, InMemoryDiagnosticSink,
    TracingDiagnosticSink,
};
pub use endpoint::{DeliveryOutcome, ReceiveEndpoint};
pub use error::{BusError, Result};
pub use fault::{AsFault, ExceptionKind, FaultEnvelope, FaultRecord, fault_event_type};
pub use memory::InMemoryBus;
pub use publisher::{BusMessage, BusPayload, EventPublisher, EventPublisherExt};
