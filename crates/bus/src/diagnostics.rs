//! Observability sink for faults that end without a republish.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fault::FaultRecord;

/// What a diagnostic record reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiagnosticKind {
    /// A fault the classifier could not match; escalated for a human.
    UnclassifiedFault,

    /// A delivery failed on every attempt of its bounded policy.
    RetriesExhausted,

    /// A bus message could not be decoded into the endpoint's message type.
    PoisonMessage,
}

impl DiagnosticKind {
    /// Returns the kind name as a string.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::UnclassifiedFault => "unclassified-fault",
            DiagnosticKind::RetriesExhausted => "retries-exhausted",
            DiagnosticKind::PoisonMessage => "poison-message",
        }
    }
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A structured diagnostic entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticRecord {
    pub kind: DiagnosticKind,
    pub exception_type: String,
    pub message: String,
    pub event_id: Option<String>,
    pub endpoint: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl DiagnosticRecord {
    /// A fault that was escalated instead of repaired.
    pub fn unclassified_fault(record: &FaultRecord, event_id: Option<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnclassifiedFault,
            exception_type: record.exception_type().to_string(),
            message: record.message().to_string(),
            event_id,
            endpoint: None,
            recorded_at: Utc::now(),
        }
    }

    /// A delivery that gave up after its final attempt.
    pub fn retries_exhausted(
        endpoint: &str,
        record: &FaultRecord,
        event_id: Option<String>,
    ) -> Self {
        Self {
            kind: DiagnosticKind::RetriesExhausted,
            exception_type: record.exception_type().to_string(),
            message: record.message().to_string(),
            event_id,
            endpoint: Some(endpoint.to_string()),
            recorded_at: Utc::now(),
        }
    }

    /// A message that could not be decoded.
    pub fn poison_message(endpoint: &str, event_type: &str, error: &impl std::fmt::Display) -> Self {
        Self {
            kind: DiagnosticKind::PoisonMessage,
            exception_type: event_type.to_string(),
            message: error.to_string(),
            event_id: None,
            endpoint: Some(endpoint.to_string()),
            recorded_at: Utc::now(),
        }
    }
}

/// Accepts diagnostic records.
///
/// Emission is fire-and-forget: implementations must never fail or panic
/// into the caller.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, record: DiagnosticRecord);
}

/// Writes diagnostics to the tracing pipeline and counts them.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingDiagnosticSink;

impl DiagnosticSink for TracingDiagnosticSink {
    fn emit(&self, record: DiagnosticRecord) {
        metrics::counter!("diagnostics_emitted_total", "kind" => record.kind.as_str())
            .increment(1);
        tracing::warn!(
            kind = %record.kind,
            exception_type = %record.exception_type,
            event_id = record.event_id.as_deref().unwrap_or("unknown"),
            endpoint = record.endpoint.as_deref().unwrap_or("-"),
            message = %record.message,
            "diagnostic emitted"
        );
    }
}

/// Collects diagnostics in memory for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDiagnosticSink {
    records: Arc<Mutex<Vec<DiagnosticRecord>>>,
}

impl InMemoryDiagnosticSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every record emitted so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    /// Returns the records of the given kind.
    pub fn records_of_kind(&self, kind: DiagnosticKind) -> Vec<DiagnosticRecord> {
        self.records()
            .into_iter()
            .filter(|r| r.kind == kind)
            .collect()
    }

    /// Returns the number of records emitted so far.
    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    /// Returns true if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl DiagnosticSink for InMemoryDiagnosticSink {
    fn emit(&self, record: DiagnosticRecord) {
        if let Ok(mut records) = self.records.lock() {
            records.push(record);
        }
    }
}

impl<S: DiagnosticSink + ?Sized> DiagnosticSink for Arc<S> {
    fn emit(&self, record: DiagnosticRecord) {
        (**self).emit(record);
    }
}
