//! Node configuration loaded from environment variables.

use std::time::Duration;

use compensation::{DEFAULT_FALLBACK_MODEL, ExceptionClassifier};
use resilience::{NotReadyPredicate, RetryPolicy};

use crate::search::REJECTED_MODEL;

/// Output format of the fmt layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "text" => Some(LogFormat::Text),
            "json" => Some(LogFormat::Json),
            _ => None,
        }
    }
}

/// Node configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `CONSUME_RETRY_LIMIT`: retries after the first consume attempt (default: `5`)
/// - `CONSUME_RETRY_INTERVAL_MS`: wait between consume attempts (default: `5000`)
/// - `PROBE_URL`: dependency to wait for at startup (default: none)
/// - `PROBE_INTERVAL_MS`: wait between probes (default: `3000`)
/// - `PROBE_TIMEOUT_MS`: per-probe HTTP timeout (default: `10000`)
/// - `REPAIR_FALLBACK_MODEL`: model written by argument-fault repairs (default: `"FooBar"`).
///   The model the search index rejects is refused, since every repaired
///   event would fault again.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub consume_retry_limit: u32,
    pub consume_retry_interval: Duration,
    pub probe_url: Option<String>,
    pub probe_interval: Duration,
    pub probe_timeout: Duration,
    pub repair_fallback_model: String,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| {
            lookup(key)
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis)
                .unwrap_or(default)
        };

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .and_then(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            consume_retry_limit: lookup("CONSUME_RETRY_LIMIT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.consume_retry_limit),
            consume_retry_interval: millis(
                "CONSUME_RETRY_INTERVAL_MS",
                defaults.consume_retry_interval,
            ),
            probe_url: lookup("PROBE_URL").filter(|url| !url.trim().is_empty()),
            probe_interval: millis("PROBE_INTERVAL_MS", defaults.probe_interval),
            probe_timeout: millis("PROBE_TIMEOUT_MS", defaults.probe_timeout),
            repair_fallback_model: match lookup("REPAIR_FALLBACK_MODEL") {
                Some(model) if model == REJECTED_MODEL => {
                    tracing::warn!(
                        %model,
                        fallback = %defaults.repair_fallback_model,
                        "REPAIR_FALLBACK_MODEL is rejected by the search index, using default"
                    );
                    defaults.repair_fallback_model
                }
                Some(model) => model,
                None => defaults.repair_fallback_model,
            },
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The bounded policy every receive endpoint consumes under.
    pub fn consume_policy(&self) -> RetryPolicy {
        RetryPolicy::retries(self.consume_retry_limit, self.consume_retry_interval)
    }

    /// The unbounded policy used while waiting for `PROBE_URL`.
    pub fn probe_policy(&self) -> RetryPolicy<NotReadyPredicate> {
        RetryPolicy::unbounded(self.probe_interval).retry_if(NotReadyPredicate)
    }

    /// The classifier used by the compensation endpoint.
    pub fn classifier(&self) -> ExceptionClassifier {
        ExceptionClassifier::with_model_fallback(self.repair_fallback_model.clone())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            consume_retry_limit: 5,
            consume_retry_interval: Duration::from_millis(5000),
            probe_url: None,
            probe_interval: Duration::from_millis(3000),
            probe_timeout: Duration::from_millis(10_000),
            repair_fallback_model: DEFAULT_FALLBACK_MODEL.to_string(),
        }
    }
}
