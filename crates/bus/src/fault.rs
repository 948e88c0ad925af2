//! Fault envelopes and the exception records they carry.

use chrono::{DateTime, Utc};
use common::MessageId;
use serde::{Deserialize, Serialize};

use crate::error::BusError;

/// Returns the event type key a fault for `event_type` is published under.
pub fn fault_event_type(event_type: &str) -> String {
    format!("Fault<{event_type}>")
}

/// Exception kinds known at the transport boundary.
///
/// Parsed from the exception type identifier carried by each [`FaultRecord`].
/// Identifiers are accepted with or without the `System.` namespace. Anything
/// unrecognised is kept verbatim in [`ExceptionKind::Other`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExceptionKind {
    Argument,
    ArgumentNull,
    NullReference,
    InvalidOperation,
    Timeout,
    /// The broker or another transport dependency failed.
    Transport,
    Other(String),
}

impl ExceptionKind {
    /// Parses an exception type identifier.
    pub fn from_type_name(type_name: &str) -> Self {
        let short = type_name.strip_prefix("System.").unwrap_or(type_name);
        match short {
            "ArgumentException" => ExceptionKind::Argument,
            "ArgumentNullException" => ExceptionKind::ArgumentNull,
            "NullReferenceException" => ExceptionKind::NullReference,
            "InvalidOperationException" => ExceptionKind::InvalidOperation,
            "TimeoutException" => ExceptionKind::Timeout,
            "TransportException" => ExceptionKind::Transport,
            _ => ExceptionKind::Other(type_name.to_string()),
        }
    }

    /// Returns the canonical type identifier written into fault records.
    pub fn type_name(&self) -> &str {
        match self {
            ExceptionKind::Argument => "System.ArgumentException",
            ExceptionKind::ArgumentNull => "System.ArgumentNullException",
            ExceptionKind::NullReference => "System.NullReferenceException",
            ExceptionKind::InvalidOperation => "System.InvalidOperationException",
            ExceptionKind::Timeout => "System.TimeoutException",
            ExceptionKind::Transport => "TransportException",
            ExceptionKind::Other(name) => name,
        }
    }
}

impl std::fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.type_name())
    }
}

/// An error that can be reported in a fault record.
pub trait AsFault: std::error::Error {
    /// Returns the exception kind this error is reported as.
    fn exception_kind(&self) -> ExceptionKind;
}

/// One exception raised while consuming a message.
///
/// Immutable once built by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FaultRecord {
    exception_type: String,
    message: String,
    stack_trace: Option<String>,
}

impl FaultRecord {
    /// Creates a record from a raw exception type identifier and message.
    pub fn new(exception_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            exception_type: exception_type.into(),
            message: message.into(),
            stack_trace: None,
        }
    }

    /// Attaches stack context.
    pub fn with_stack_trace(mut self, stack_trace: impl Into<String>) -> Self {
        self.stack_trace = Some(stack_trace.into());
        self
    }

    /// Builds a record from an error, using its source chain as stack context.
    pub fn from_error<E: AsFault + ?Sized>(error: &E) -> Self {
        let mut chain = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            chain.push(format!("caused by: {cause}"));
            source = cause.source();
        }

        Self {
            exception_type: error.exception_kind().type_name().to_string(),
            message: error.to_string(),
            stack_trace: (!chain.is_empty()).then(|| chain.join("\n")),
        }
    }

    /// Returns the raw exception type identifier.
    pub fn exception_type(&self) -> &str {
        &self.exception_type
    }

    /// Returns the parsed exception kind.
    pub fn kind(&self) -> ExceptionKind {
        ExceptionKind::from_type_name(&self.exception_type)
    }

    /// Returns the exception message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stack context, if any.
    pub fn stack_trace(&self) -> Option<&str> {
        self.stack_trace.as_deref()
    }
}

/// A message whose consumption failed, with the exceptions it raised.
///
/// Exceptions are kept in occurrence order and there is always at least one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFaultEnvelope<M>")]
pub struct FaultEnvelope<M> {
    fault_id: MessageId,
    fault_message_id: Option<MessageId>,
    timestamp: DateTime<Utc>,
    message: M,
    exceptions: Vec<FaultRecord>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFaultEnvelope<M> {
    fault_id: MessageId,
    fault_message_id: Option<MessageId>,
    timestamp: DateTime<Utc>,
    message: M,
    exceptions: Vec<FaultRecord>,
}

impl<M> TryFrom<RawFaultEnvelope<M>> for FaultEnvelope<M> {
    type Error = BusError;

    fn try_from(raw: RawFaultEnvelope<M>) -> Result<Self, Self::Error> {
        if raw.exceptions.is_empty() {
            return Err(BusError::EmptyFault);
        }

        Ok(Self {
            fault_id: raw.fault_id,
            fault_message_id: raw.fault_message_id,
            timestamp: raw.timestamp,
            message: raw.message,
            exceptions: raw.exceptions,
        })
    }
}

impl<M> FaultEnvelope<M> {
    /// Wraps `message` with its exception records.
    ///
    /// # Errors
    ///
    /// Returns `BusError::EmptyFault` if `exceptions` is empty.
    pub fn new(message: M, exceptions: Vec<FaultRecord>) -> Result<Self, BusError> {
        if exceptions.is_empty() {
            return Err(BusError::EmptyFault);
        }

        Ok(Self {
            fault_id: MessageId::new(),
            fault_message_id: None,
            timestamp: Utc::now(),
            message,
            exceptions,
        })
    }

    /// Wraps `message` with a single record built from `error`.
    pub fn from_error<E: AsFault + ?Sized>(message: M, error: &E) -> Self {
        Self {
            fault_id: MessageId::new(),
            fault_message_id: None,
            timestamp: Utc::now(),
            message,
            exceptions: vec![FaultRecord::from_error(error)],
        }
    }

    /// Records the bus ID of the message that faulted.
    pub fn with_fault_message_id(mut self, message_id: MessageId) -> Self {
        self.fault_message_id = Some(message_id);
        self
    }

    /// Returns the ID of this fault.
    pub fn fault_id(&self) -> MessageId {
        self.fault_id
    }

    /// Returns the bus ID of the message that faulted, if known.
    pub fn fault_message_id(&self) -> Option<MessageId> {
        self.fault_message_id
    }

    /// Returns when the fault was raised.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Returns the first reported exception.
    pub fn first_exception(&self) -> &FaultRecord {
        &self.exceptions[0]
    }

    /// Returns all exceptions in occurrence order.
    pub fn exceptions(&self) -> &[FaultRecord] {
        &self.exceptions
    }

    /// Returns the wrapped message.
    pub fn message(&self) -> &M {
        &self.message
    }

    /// Returns the wrapped message for in-place repair.
    pub fn message_mut(&mut self) -> &mut M {
        &mut self.message
    }

    /// Consumes the envelope, returning the wrapped message.
    pub fn into_message(self) -> M {
        self.message
    }
}
