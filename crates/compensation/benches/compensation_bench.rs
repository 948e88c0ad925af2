use async_trait::async_trait;
use bus::{DiagnosticRecord, DiagnosticSink, EventPublisher, FaultEnvelope, FaultRecord};
use common::MessageId;
use compensation::{ExceptionClassifier, FaultCompensator};
use contracts::AuctionCreated;
use criterion::{Criterion, criterion_group, criterion_main};

/// Accepts every publish without recording it.
struct DiscardPublisher;

#[async_trait]
impl EventPublisher for DiscardPublisher {
    async fn publish(
        &self,
        _event_type: &str,
        _payload: serde_json::Value,
    ) -> bus::Result<MessageId> {
        Ok(MessageId::new())
    }
}

struct DiscardSink;

impl DiagnosticSink for DiscardSink {
    fn emit(&self, _record: DiagnosticRecord) {}
}

fn envelope(exception_type: &str) -> FaultEnvelope<AuctionCreated> {
    FaultEnvelope::new(
        AuctionCreated::new("bench", "Ford", "", 2020),
        vec![FaultRecord::new(exception_type, "bench")],
    )
    .unwrap()
}

fn bench_classify(c: &mut Criterion) {
    let classifier = ExceptionClassifier::default();
    let repairable = FaultRecord::new("System.ArgumentException", "bench");
    let unknown = FaultRecord::new("Acme.WidgetException", "bench");

    c.bench_function("compensation/classify_repairable", |b| {
        b.iter(|| classifier.classify(&repairable));
    });

    c.bench_function("compensation/classify_unknown", |b| {
        b.iter(|| classifier.classify(&unknown));
    });
}

fn bench_handle(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let compensator =
        FaultCompensator::new(ExceptionClassifier::default(), DiscardPublisher, DiscardSink);
    let repairable = envelope("ArgumentException");
    let unknown = envelope("NullReferenceException");

    c.bench_function("compensation/handle_repair", |b| {
        b.iter(|| {
            rt.block_on(async { compensator.handle(repairable.clone()).await.unwrap() });
        });
    });

    c.bench_function("compensation/handle_escalate", |b| {
        b.iter(|| {
            rt.block_on(async { compensator.handle(unknown.clone()).await.unwrap() });
        });
    });
}

criterion_group!(benches, bench_classify, bench_handle);
criterion_main!(benches);
