//! HTTP probe execution.
//!
//! `HttpProber` issues a single GET with a per-request deadline and up to
//! five followed redirects. The wall-clock elapsed time is reported for
//! every outcome, including failures, so response-time history covers
//! timeouts too.

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tracing::debug;

/// Raw result of a single probe, before health classification.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeOutcome {
    /// HTTP status of the final response; `None` on transport failure.
    pub status_code: Option<u16>,
    /// Wall-clock milliseconds from dispatch to response or failure.
    pub response_time_ms: f64,
    /// Transport error text, when no response was obtained.
    pub error: Option<String>,
}

/// Executes probes against target URLs.
///
/// Object-safe so the engine can take an injected `Arc<dyn Prober>` and
/// tests can substitute scripted outcomes.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a URL with the given deadline. Never retries.
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome;
}

/// Maximum redirects followed before the probe counts as failed.
const MAX_REDIRECTS: usize = 5;

/// reqwest-backed prober.
///
/// The client is built once and reused; per-service deadlines are applied
/// per request, not on the client.
pub struct HttpProber {
    client: reqwest::Client,
}

impl HttpProber {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("pulsewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, url: &str, timeout: Duration) -> ProbeOutcome {
        let started = Instant::now();
        let result = self.client.get(url).timeout(timeout).send().await;
        let response_time_ms = started.elapsed().as_secs_f64() * 1000.0;

        match result {
            Ok(response) => {
                let status = response.status().as_u16();
                debug!(%url, status, response_time_ms, "probe completed");
                ProbeOutcome {
                    status_code: Some(status),
                    response_time_ms,
                    error: None,
                }
            }
            Err(e) => {
                let error = error_text(&e, timeout);
                debug!(%url, %error, response_time_ms, "probe failed");
                ProbeOutcome {
                    status_code: None,
                    response_time_ms,
                    error: Some(error),
                }
            }
        }
    }
}

fn error_text(e: &reqwest::Error, timeout: Duration) -> String {
    if e.is_timeout() {
        format!("request timed out after {}ms", timeout.as_millis())
    } else if e.is_redirect() {
        format!("stopped after {MAX_REDIRECTS} redirects")
    } else if e.is_connect() {
        format!("connection failed: {e}")
    } else {
        e.to_string()
    }
}
