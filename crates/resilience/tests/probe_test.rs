//! Integration tests for dependency probing.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::http::StatusCode;
use axum::routing::get;
use resilience::{
    CancellationToken, DependencyProbe, HttpProbe, NotReadyPredicate, ProbeError, ProbeStatus,
    RetryPolicy, RetryPredicate, wait_for_dependency,
};

/// Answers with scripted statuses, repeating the last one forever.
struct ScriptedProbe {
    script: Vec<Result<u16, &'static str>>,
    calls: AtomicU32,
}

impl ScriptedProbe {
    fn new(script: Vec<Result<u16, &'static str>>) -> Self {
        Self {
            script,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DependencyProbe for ScriptedProbe {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self) -> Result<ProbeStatus, ProbeError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) as usize;
        let step = self.script[call.min(self.script.len() - 1)];
        match step {
            Ok(code) => Ok(ProbeStatus::new(code)),
            Err(reason) => Err(ProbeError::Unavailable(reason.to_string())),
        }
    }
}

fn probe_policy() -> RetryPolicy<NotReadyPredicate> {
    RetryPolicy::unbounded(Duration::from_secs(3)).retry_if(NotReadyPredicate)
}

#[tokio::test(start_paused = true)]
async fn waits_through_not_found_and_unavailable() {
    let probe = ScriptedProbe::new(vec![
        Err("connection refused"),
        Ok(503),
        Ok(404),
        Ok(404),
        Ok(200),
    ]);

    let status = wait_for_dependency(&probe, &probe_policy(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status.code(), 200);
    assert_eq!(probe.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn non_retryable_status_fails_immediately() {
    let probe = ScriptedProbe::new(vec![Ok(401)]);

    let err = wait_for_dependency(&probe, &probe_policy(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Rejected(status) if status.code() == 401));
    assert_eq!(probe.calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_stops_waiting() {
    let probe = Arc::new(ScriptedProbe::new(vec![Ok(404)]));
    let token = CancellationToken::new();

    let task = {
        let probe = Arc::clone(&probe);
        let token = token.clone();
        tokio::spawn(async move {
            wait_for_dependency(probe.as_ref(), &probe_policy(), &token).await
        })
    };

    tokio::time::sleep(Duration::from_secs(7)).await;
    token.cancel();

    let err = task.await.unwrap().unwrap_err();
    assert!(matches!(err, ProbeError::Cancelled { attempts: 3 }));
    assert_eq!(probe.calls(), 3);
}

async fn serve(app: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn http_probe_retries_until_peer_registers_resource() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/api/auctions",
        get(move || {
            let counter = Arc::clone(&counter);
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    StatusCode::NOT_FOUND
                } else {
                    StatusCode::OK
                }
            }
        }),
    );
    let base = serve(app).await;

    let probe = HttpProbe::new(format!("{base}/api/auctions"), Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy::unbounded(Duration::from_millis(10)).retry_if(NotReadyPredicate);

    let status = wait_for_dependency(&probe, &policy, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(status.code(), 200);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn http_probe_reports_client_errors_without_retrying() {
    let hits = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&hits);
    let app = Router::new().route(
        "/api/auctions",
        get(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { StatusCode::FORBIDDEN }
        }),
    );
    let base = serve(app).await;

    let probe = HttpProbe::new(format!("{base}/api/auctions"), Duration::from_secs(5)).unwrap();
    let policy = RetryPolicy::unbounded(Duration::from_millis(10)).retry_if(NotReadyPredicate);

    let err = wait_for_dependency(&probe, &policy, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, ProbeError::Rejected(status) if status.code() == 403));
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn http_probe_keeps_retrying_refused_connections_until_shutdown() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let probe = HttpProbe::new(format!("http://{addr}/api/auctions"), Duration::from_secs(1))
        .unwrap();

    let refused = probe.probe().await;
    assert!(matches!(refused, Err(ProbeError::Transport(_))));
    assert!(NotReadyPredicate.should_retry(&refused));

    let policy = RetryPolicy::unbounded(Duration::from_millis(20)).retry_if(NotReadyPredicate);
    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        canceller.cancel();
    });

    let err = wait_for_dependency(&probe, &policy, &token)
        .await
        .unwrap_err();

    match err {
        ProbeError::Cancelled { attempts } => assert!(attempts >= 2, "only {attempts} attempt(s)"),
        other => panic!("expected cancellation, got {other}"),
    }
}
