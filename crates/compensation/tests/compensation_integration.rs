//! Integration tests for fault compensation behind a receive endpoint.

use std::sync::Arc;
use std::time::Duration;

use bus::{
    BusMessage, DeliveryOutcome, DiagnosticKind, EventPublisher, FaultEnvelope, FaultRecord,
    InMemoryBus, InMemoryDiagnosticSink, ReceiveEndpoint, fault_event_type,
};
use compensation::{CompensationOutcome, ExceptionClassifier, FaultCompensator};
use contracts::{AuctionCreated, IntegrationEvent};
use resilience::{CancellationToken, RetryPolicy};

type Compensator = FaultCompensator<InMemoryBus, InMemoryDiagnosticSink>;
type CompensationEndpoint = ReceiveEndpoint<FaultEnvelope<AuctionCreated>, Compensator>;

struct TestHarness {
    bus: InMemoryBus,
    compensation_diagnostics: InMemoryDiagnosticSink,
    endpoint_diagnostics: InMemoryDiagnosticSink,
    compensator: Arc<Compensator>,
    token: CancellationToken,
}

impl TestHarness {
    fn new() -> Self {
        let bus = InMemoryBus::recording();
        let compensation_diagnostics = InMemoryDiagnosticSink::new();
        let compensator = Arc::new(FaultCompensator::new(
            ExceptionClassifier::default(),
            bus.clone(),
            compensation_diagnostics.clone(),
        ));

        Self {
            bus,
            compensation_diagnostics,
            endpoint_diagnostics: InMemoryDiagnosticSink::new(),
            compensator,
            token: CancellationToken::new(),
        }
    }

    fn endpoint(&self, retry_limit: u32) -> CompensationEndpoint {
        ReceiveEndpoint::new(
            "search-auction-created-fault",
            Arc::clone(&self.compensator),
            Arc::new(RetryPolicy::retries(retry_limit, Duration::from_secs(5))),
            Arc::new(self.endpoint_diagnostics.clone()),
            self.token.clone(),
        )
    }

    async fn republished(&self) -> Vec<AuctionCreated> {
        self.bus
            .published_of_type(AuctionCreated::EVENT_TYPE)
            .await
            .iter()
            .map(|m: &BusMessage| m.decode().unwrap())
            .collect()
    }
}

fn faulted(model: &str, exception_type: &str) -> FaultEnvelope<AuctionCreated> {
    FaultEnvelope::new(
        AuctionCreated::new("bob", "Audi", model, 2021),
        vec![FaultRecord::new(exception_type, "Model name rejected")],
    )
    .unwrap()
}

#[tokio::test]
async fn test_argument_fault_is_repaired_and_republished_once() {
    let h = TestHarness::new();
    let envelope = faulted("", "ArgumentException");
    let original = envelope.message().clone();

    let outcome = h.compensator.handle(envelope).await.unwrap();

    assert!(matches!(outcome, CompensationOutcome::Republished { .. }));
    let republished = h.republished().await;
    assert_eq!(republished.len(), 1);
    assert_eq!(republished[0].model, "FooBar");
    assert_eq!(republished[0].id, original.id);
    assert_eq!(republished[0].make, original.make);
    assert!(h.compensation_diagnostics.is_empty());
}

#[tokio::test]
async fn test_null_reference_fault_is_escalated() {
    let h = TestHarness::new();

    let outcome = h
        .compensator
        .handle(faulted("", "NullReferenceException"))
        .await
        .unwrap();

    assert!(matches!(outcome, CompensationOutcome::Escalated { .. }));
    assert_eq!(h.bus.publish_count().await, 0);

    let records = h
        .compensation_diagnostics
        .records_of_kind(DiagnosticKind::UnclassifiedFault);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].exception_type, "NullReferenceException");
}

#[tokio::test]
async fn test_redelivered_fault_produces_identical_event() {
    let h = TestHarness::new();
    let envelope = faulted("Foo", "System.ArgumentException");

    h.compensator.handle(envelope.clone()).await.unwrap();
    h.compensator.handle(envelope).await.unwrap();

    let republished = h.republished().await;
    assert_eq!(republished.len(), 2);
    assert_eq!(republished[0], republished[1]);
}

#[tokio::test(start_paused = true)]
async fn test_bounded_retry_rides_out_publish_outage() {
    let h = TestHarness::new();
    let endpoint = h.endpoint(5);
    h.bus.fail_next_publishes(2).await;

    let outcome = endpoint.deliver(faulted("", "ArgumentException")).await;

    assert_eq!(outcome, DeliveryOutcome::Consumed { attempts: 3 });
    assert_eq!(h.republished().await.len(), 1);
    assert!(h.endpoint_diagnostics.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_persistent_publish_outage_exhausts_retries() {
    let h = TestHarness::new();
    let endpoint = h.endpoint(2);
    h.bus.fail_next_publishes(10).await;

    let outcome = endpoint.deliver(faulted("", "ArgumentException")).await;

    assert_eq!(outcome, DeliveryOutcome::Faulted { attempts: 3 });
    assert_eq!(h.bus.publish_count().await, 0);

    let records = h.endpoint_diagnostics.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].kind, DiagnosticKind::RetriesExhausted);
    assert_eq!(records[0].exception_type, "TransportException");
}

#[tokio::test(start_paused = true)]
async fn test_endpoint_consumes_faults_from_the_bus() {
    let h = TestHarness::new();
    let endpoint = Arc::new(h.endpoint(5));
    let mut repaired = h.bus.subscribe(AuctionCreated::EVENT_TYPE).await;
    let faults = h
        .bus
        .subscribe(&fault_event_type(AuctionCreated::EVENT_TYPE))
        .await;
    let running = tokio::spawn(Arc::clone(&endpoint).run(faults));

    let envelope = faulted("Foo", "ArgumentException");
    let auction_id = envelope.message().id;
    h.bus
        .publish(
            &fault_event_type(AuctionCreated::EVENT_TYPE),
            serde_json::to_value(&envelope).unwrap(),
        )
        .await
        .unwrap();

    let message = repaired.recv().await.unwrap();
    let event: AuctionCreated = message.decode().unwrap();
    assert_eq!(event.id, auction_id);
    assert_eq!(event.model, "FooBar");

    h.token.cancel();
    running.await.unwrap();
}
