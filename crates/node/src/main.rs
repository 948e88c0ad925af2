//! Node entry point.

use std::sync::Arc;

use bus::{DiagnosticSink, InMemoryBus, TracingDiagnosticSink};
use node::config::{Config, LogFormat};
use node::search::SearchIndex;
use resilience::{HttpProbe, ProbeError, wait_for_dependency};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM), then cancels `token`.
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
    token.cancel();
}

fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let json = config.log_format == LogFormat::Json;

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(tracing_subscriber::fmt::layer))
        .init();
}

#[tokio::main]
async fn main() {
    // 1. Load configuration and initialize tracing
    let config = Config::from_env();
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Route shutdown signals into the root token
    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // 4. Wait for the upstream dependency, if one is configured
    if let Some(url) = &config.probe_url {
        let probe =
            HttpProbe::new(url.clone(), config.probe_timeout).expect("invalid probe configuration");
        tracing::info!(%url, interval = ?config.probe_interval, "waiting for dependency");

        match wait_for_dependency(&probe, &config.probe_policy(), &shutdown.child_token()).await {
            Ok(status) => tracing::info!(%url, %status, "dependency ready"),
            Err(ProbeError::Cancelled { attempts }) => {
                tracing::info!(attempts, "shutdown requested while waiting for dependency");
                return;
            }
            Err(e) => {
                tracing::error!(%url, error = %e, "dependency refused startup probe");
                std::process::exit(1);
            }
        }
    }

    // 5. Start receive endpoints
    let bus = InMemoryBus::new();
    let diagnostics: Arc<dyn DiagnosticSink> = Arc::new(TracingDiagnosticSink);
    let mut endpoints =
        node::spawn_endpoints(&config, &bus, SearchIndex::new(), diagnostics, &shutdown).await;

    // 6. Start server
    let app = node::create_app(metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, "starting node");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    let server_shutdown = shutdown.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { server_shutdown.cancelled().await })
        .await
        .expect("server error");

    // 7. Drain endpoints
    shutdown.cancel();
    while let Some(joined) = endpoints.join_next().await {
        if let Err(e) = joined {
            tracing::error!(error = %e, "receive endpoint task failed");
        }
    }

    tracing::info!("node shut down gracefully");
}
