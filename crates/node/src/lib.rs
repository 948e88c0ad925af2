//! Service node for search indexing and fault compensation.
//!
//! Wires two receive endpoints onto one bus:
//! - `search-auction-created` indexes `AuctionCreated` events and publishes
//!   `Fault<AuctionCreated>` when a delivery runs out of retries
//! - `auction-auction-created-fault` compensates those faults and republishes
//!   the repaired event
//!
//! The HTTP surface is limited to `/health` and `/metrics`.

pub mod config;
pub mod routes;
pub mod search;

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use bus::{DiagnosticSink, FaultEnvelope, InMemoryBus, ReceiveEndpoint, fault_event_type};
use compensation::FaultCompensator;
use contracts::{AuctionCreated, IntegrationEvent};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use config::Config;
use search::{SearchIndex, SearchIndexConsumer};

/// Endpoint that indexes created auctions.
pub const SEARCH_ENDPOINT: &str = "search-auction-created";

/// Endpoint that compensates faulted `AuctionCreated` deliveries.
pub const COMPENSATION_ENDPOINT: &str = "auction-auction-created-fault";

/// The compensation consumer as wired in the node.
pub type AuctionCompensator = FaultCompensator<InMemoryBus, Arc<dyn DiagnosticSink>>;

/// Creates the Axum application router.
pub fn create_app(metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .merge(metrics_router)
        .layer(TraceLayer::new_for_http())
}

/// Subscribes both endpoints to `bus` and runs them until `cancel` fires.
///
/// Policies and the classifier are built once from `config` and shared by
/// every delivery. The returned set completes once both endpoints have
/// drained their in-flight deliveries.
pub async fn spawn_endpoints(
    config: &Config,
    bus: &InMemoryBus,
    index: SearchIndex,
    diagnostics: Arc<dyn DiagnosticSink>,
    cancel: &CancellationToken,
) -> JoinSet<()> {
    let policy = Arc::new(config.consume_policy());
    let mut endpoints = JoinSet::new();

    let search = Arc::new(
        ReceiveEndpoint::<AuctionCreated, _>::new(
            SEARCH_ENDPOINT,
            Arc::new(SearchIndexConsumer::new(index)),
            Arc::clone(&policy),
            Arc::clone(&diagnostics),
            cancel.child_token(),
        )
        .with_fault_publisher(Arc::new(bus.clone())),
    );
    let search_messages = bus.subscribe(AuctionCreated::EVENT_TYPE).await;
    endpoints.spawn(search.run(search_messages));

    let compensator: AuctionCompensator =
        FaultCompensator::new(config.classifier(), bus.clone(), Arc::clone(&diagnostics));
    let compensation = Arc::new(ReceiveEndpoint::<FaultEnvelope<AuctionCreated>, _>::new(
        COMPENSATION_ENDPOINT,
        Arc::new(compensator),
        policy,
        diagnostics,
        cancel.child_token(),
    ));
    let fault_messages = bus
        .subscribe(&fault_event_type(AuctionCreated::EVENT_TYPE))
        .await;
    endpoints.spawn(compensation.run(fault_messages));

    tracing::info!(
        endpoints = ?[SEARCH_ENDPOINT, COMPENSATION_ENDPOINT],
        max_attempts = ?config.consume_policy().max_attempts(),
        "receive endpoints started"
    );
    endpoints
}
