//! The compensation consumer.

use async_trait::async_trait;
use bus::{
    Consumer, DiagnosticRecord, DiagnosticSink, EventPublisher, EventPublisherExt, FaultEnvelope,
};
use common::MessageId;
use contracts::{IntegrationEvent, Repairable};

use crate::classifier::{CompensationDecision, ExceptionClassifier};
use crate::error::{CompensationError, Result};

/// How a fault envelope was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompensationOutcome {
    /// The event was repaired and published again.
    Republished {
        message_id: MessageId,
        event_type: &'static str,
    },

    /// The fault was reported to the diagnostic sink. Nothing was published.
    Escalated { exception_type: String },
}

/// Repairs and republishes faulted events, or escalates them.
///
/// Holds no per-envelope state, so one instance serves any number of
/// concurrent deliveries.
pub struct FaultCompensator<P, D>
where
    P: EventPublisher,
    D: DiagnosticSink,
{
    classifier: ExceptionClassifier,
    publisher: P,
    diagnostics: D,
}

impl<P, D> FaultCompensator<P, D>
where
    P: EventPublisher,
    D: DiagnosticSink,
{
    /// Creates a compensator.
    pub fn new(classifier: ExceptionClassifier, publisher: P, diagnostics: D) -> Self {
        Self {
            classifier,
            publisher,
            diagnostics,
        }
    }

    /// Returns the classifier in use.
    pub fn classifier(&self) -> &ExceptionClassifier {
        &self.classifier
    }

    /// Handles one fault envelope.
    ///
    /// Only the first exception is classified. The repair path publishes
    /// exactly once and the escalate path emits exactly one diagnostic.
    ///
    /// # Errors
    ///
    /// Fails if the repair cannot be applied or the republish fails. The
    /// caller is expected to retry the whole envelope.
    #[tracing::instrument(
        skip(self, envelope),
        fields(event_type = E::EVENT_TYPE, fault_id = %envelope.fault_id())
    )]
    pub async fn handle<E>(&self, mut envelope: FaultEnvelope<E>) -> Result<CompensationOutcome>
    where
        E: IntegrationEvent + Repairable,
    {
        let record = envelope.first_exception();

        match self.classifier.classify(record) {
            CompensationDecision::Repair(transform) => {
                transform.apply(envelope.message_mut())?;
                let event = envelope.into_message();
                let message_id = self.publisher.publish_event(&event).await?;

                metrics::counter!("compensation_repaired_total", "event_type" => E::EVENT_TYPE)
                    .increment(1);
                tracing::info!(%message_id, %transform, "faulted event repaired and republished");

                Ok(CompensationOutcome::Republished {
                    message_id,
                    event_type: E::EVENT_TYPE,
                })
            }
            CompensationDecision::Escalate => {
                let exception_type = record.exception_type().to_string();
                let event_id = envelope.message().event_id();
                self.diagnostics
                    .emit(DiagnosticRecord::unclassified_fault(record, event_id));

                metrics::counter!("compensation_escalated_total", "event_type" => E::EVENT_TYPE)
                    .increment(1);
                tracing::debug!(%exception_type, "unclassified fault escalated");

                Ok(CompensationOutcome::Escalated { exception_type })
            }
        }
    }
}

#[async_trait]
impl<E, P, D> Consumer<FaultEnvelope<E>> for FaultCompensator<P, D>
where
    E: IntegrationEvent + Repairable,
    P: EventPublisher,
    D: DiagnosticSink,
{
    type Error = CompensationError;

    async fn consume(&self, envelope: FaultEnvelope<E>) -> Result<()> {
        self.handle(envelope).await.map(|_| ())
    }
}
