//! Receive endpoints: deliver messages to a consumer under a bounded policy.

use std::marker::PhantomData;
use std::sync::Arc;

use resilience::{RetryError, RetryPolicy};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::consumer::Consumer;
use crate::diagnostics::{DiagnosticRecord, DiagnosticSink};
use crate::fault::{FaultEnvelope, FaultRecord};
use crate::publisher::{BusMessage, BusPayload, EventPublisher, EventPublisherExt};

/// How a single delivery ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The consumer accepted the message.
    Consumed { attempts: u32 },

    /// Every attempt failed, or the failure was not retryable. A diagnostic
    /// was emitted and, if configured, a fault envelope published.
    Faulted { attempts: u32 },

    /// Shutdown interrupted the delivery between attempts.
    Cancelled { attempts: u32 },
}

impl DeliveryOutcome {
    /// Returns the number of consume attempts made.
    pub fn attempts(&self) -> u32 {
        match self {
            DeliveryOutcome::Consumed { attempts }
            | DeliveryOutcome::Faulted { attempts }
            | DeliveryOutcome::Cancelled { attempts } => *attempts,
        }
    }
}

/// A named subscription that feeds one consumer.
///
/// Deliveries are independent: each one clones the message per attempt and
/// shares nothing with other in-flight deliveries except the read-only policy.
pub struct ReceiveEndpoint<M, C> {
    name: String,
    consumer: Arc<C>,
    policy: Arc<RetryPolicy>,
    diagnostics: Arc<dyn DiagnosticSink>,
    fault_publisher: Option<Arc<dyn EventPublisher>>,
    cancel: CancellationToken,
    _message: PhantomData<fn() -> M>,
}

impl<M, C> ReceiveEndpoint<M, C>
where
    M: BusPayload,
    C: Consumer<M> + 'static,
{
    /// Creates an endpoint named `name` for `consumer`.
    pub fn new(
        name: impl Into<String>,
        consumer: Arc<C>,
        policy: Arc<RetryPolicy>,
        diagnostics: Arc<dyn DiagnosticSink>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            name: name.into(),
            consumer,
            policy,
            diagnostics,
            fault_publisher: None,
            cancel,
            _message: PhantomData,
        }
    }

    /// Publishes a fault envelope for every delivery that faults.
    pub fn with_fault_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.fault_publisher = Some(publisher);
        self
    }

    /// Returns the endpoint name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Delivers one message, retrying per the endpoint policy.
    #[tracing::instrument(skip(self, message), fields(endpoint = %self.name, event_type = %M::event_type()))]
    pub async fn deliver(&self, message: M) -> DeliveryOutcome {
        let started = std::time::Instant::now();
        let mut attempts_made = 0;

        let result = self
            .policy
            .execute(&self.cancel, |attempt| {
                attempts_made = attempt;
                let consumer = Arc::clone(&self.consumer);
                let message = message.clone();
                async move { consumer.consume(message).await }
            })
            .await;

        metrics::histogram!("endpoint_consume_duration_seconds", "endpoint" => self.name.clone())
            .record(started.elapsed().as_secs_f64());

        match result {
            Ok(()) | Err(RetryError::Exhausted { last: Ok(()), .. }) => {
                metrics::counter!("endpoint_messages_consumed_total", "endpoint" => self.name.clone())
                    .increment(1);
                tracing::debug!(attempts = attempts_made, "message consumed");
                DeliveryOutcome::Consumed {
                    attempts: attempts_made,
                }
            }
            Err(RetryError::Rejected { attempts, source })
            | Err(RetryError::Exhausted {
                attempts,
                last: Err(source),
            }) => {
                self.fault(message, &source, attempts).await;
                DeliveryOutcome::Faulted { attempts }
            }
            Err(RetryError::Cancelled { attempts }) => {
                tracing::info!(attempts, "delivery cancelled by shutdown");
                DeliveryOutcome::Cancelled { attempts }
            }
        }
    }

    async fn fault(&self, message: M, error: &C::Error, attempts: u32) {
        let record = FaultRecord::from_error(error);
        let event_id = message.event_id();

        metrics::counter!("endpoint_messages_dead_lettered_total", "endpoint" => self.name.clone())
            .increment(1);
        tracing::error!(
            attempts,
            exception_type = record.exception_type(),
            error = %error,
            "delivery faulted"
        );

        self.diagnostics.emit(DiagnosticRecord::retries_exhausted(
            &self.name,
            &record,
            event_id,
        ));

        if let Some(publisher) = &self.fault_publisher {
            let envelope = FaultEnvelope::from_error(message, error);
            if let Err(e) = publisher.publish_fault(&envelope).await {
                tracing::error!(error = %e, "failed to publish fault envelope");
            }
        }
    }

    /// Receives bus messages until the channel closes or the token fires.
    ///
    /// Each message is delivered on its own task. On shutdown the loop stops
    /// accepting messages and waits for in-flight deliveries, which observe
    /// the same token between attempts.
    pub async fn run(self: Arc<Self>, mut receiver: mpsc::UnboundedReceiver<BusMessage>) {
        tracing::info!(endpoint = %self.name, "receive endpoint started");
        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => break,
                received = receiver.recv() => {
                    let Some(bus_message) = received else { break };
                    match bus_message.decode::<M>() {
                        Ok(message) => {
                            let endpoint = Arc::clone(&self);
                            in_flight.spawn(async move { endpoint.deliver(message).await });
                        }
                        Err(e) => {
                            tracing::error!(
                                endpoint = %self.name,
                                message_id = %bus_message.message_id,
                                error = %e,
                                "undecodable message"
                            );
                            self.diagnostics.emit(DiagnosticRecord::poison_message(
                                &self.name,
                                &bus_message.event_type,
                                &e,
                            ));
                        }
                    }
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(endpoint = %self.name, error = %e, "delivery task failed");
                    }
                }
            }
        }

        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(endpoint = %self.name, error = %e, "delivery task failed");
            }
        }
        tracing::info!(endpoint = %self.name, "receive endpoint stopped");
    }
}
