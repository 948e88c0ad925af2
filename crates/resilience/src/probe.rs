//! Dependency probe port and its HTTP implementation.
//!
//! A probe asks an external dependency whether it is ready. Callers wrap the
//! probe in an unbounded [`RetryPolicy`] so startup waits for the dependency
//! instead of failing fast.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::error::RetryError;
use crate::policy::{RetryPolicy, RetryPredicate};

/// Status code returned by a probed dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProbeStatus(u16);

impl ProbeStatus {
    /// Wraps a raw status code.
    pub fn new(code: u16) -> Self {
        Self(code)
    }

    /// Returns the raw status code.
    pub fn code(&self) -> u16 {
        self.0
    }

    /// Returns true for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.0)
    }

    /// Returns true for statuses that mean "try again later": 404 (the peer
    /// is up but has not registered the resource yet), 408, 429 and any 5xx.
    pub fn is_not_ready(&self) -> bool {
        matches!(self.0, 404 | 408 | 429) || (500..600).contains(&self.0)
    }
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while probing a dependency.
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The request could not be sent or no response arrived.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// A non-HTTP dependency reported that it is not reachable yet.
    #[error("Dependency unavailable: {0}")]
    Unavailable(String),

    /// The dependency answered with a status that will not improve by waiting.
    #[error("Dependency rejected probe with status {0}")]
    Rejected(ProbeStatus),

    /// The probe client could not be configured.
    #[error("Probe configuration error: {0}")]
    Configuration(String),

    /// Waiting was abandoned because of shutdown.
    #[error("Probe cancelled after {attempts} attempt(s)")]
    Cancelled { attempts: u32 },
}

/// Asks an external dependency whether it is ready.
#[async_trait]
pub trait DependencyProbe: Send + Sync {
    /// Returns a human-readable name for logs.
    fn name(&self) -> &str;

    /// Performs one probe call.
    async fn probe(&self) -> Result<ProbeStatus, ProbeError>;
}

/// Retries transport failures and "not ready" statuses.
///
/// Equivalent to treating transient HTTP errors, or a 404, as retryable.
/// Client-side misconfiguration and other statuses are not retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotReadyPredicate;

impl RetryPredicate<ProbeStatus, ProbeError> for NotReadyPredicate {
    fn should_retry(&self, outcome: &Result<ProbeStatus, ProbeError>) -> bool {
        match outcome {
            Ok(status) => status.is_not_ready(),
            Err(ProbeError::Transport(err)) => !err.is_builder(),
            Err(ProbeError::Unavailable(_)) => true,
            Err(_) => false,
        }
    }
}

/// Probes an HTTP endpoint with a GET request.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Creates a probe for `url` with a per-request timeout.
    ///
    /// # Errors
    ///
    /// Returns `ProbeError::Configuration` if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Returns the probed URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl DependencyProbe for HttpProbe {
    fn name(&self) -> &str {
        &self.url
    }

    #[tracing::instrument(skip(self), fields(url = %self.url))]
    async fn probe(&self) -> Result<ProbeStatus, ProbeError> {
        let response = self.client.get(&self.url).send().await?;
        let status = ProbeStatus::new(response.status().as_u16());
        tracing::debug!(%status, "probe answered");
        Ok(status)
    }
}

/// Waits until `probe` reports success, retrying per `policy`.
///
/// With an unbounded policy this only returns an error for a non-retryable
/// outcome or when `cancel` fires.
#[tracing::instrument(skip_all, fields(dependency = probe.name()))]
pub async fn wait_for_dependency<D, P>(
    probe: &D,
    policy: &RetryPolicy<P>,
    cancel: &CancellationToken,
) -> Result<ProbeStatus, ProbeError>
where
    D: DependencyProbe + ?Sized,
    P: RetryPredicate<ProbeStatus, ProbeError>,
{
    let result = policy
        .execute(cancel, |attempt| async move {
            tracing::debug!(attempt, "probing dependency");
            probe.probe().await
        })
        .await;

    match result {
        Ok(status) if status.is_success() => {
            tracing::info!(%status, "dependency ready");
            Ok(status)
        }
        Ok(status) => Err(ProbeError::Rejected(status)),
        Err(RetryError::Rejected { source, .. }) => Err(source),
        Err(RetryError::Exhausted { last, .. }) => match last {
            Ok(status) => Err(ProbeError::Rejected(status)),
            Err(err) => Err(err),
        },
        Err(RetryError::Cancelled { attempts }) => Err(ProbeError::Cancelled { attempts }),
    }
}
