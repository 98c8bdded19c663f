//! Resilient single-URL HTTP retrieval for bot-hostile government portals.
//!
//! The [`FetchGateway`] retrieves a URL despite anti-bot defenses and
//! transient faults without hammering a failing host:
//!
//! - an ordered attempt list of URL variants × header profiles, ending in a
//!   bare last-resort attempt (see [`profiles`](crate::profiles));
//! - best-effort HEAD before each GET;
//! - transport-level retry with exponential backoff beneath each request;
//! - per-host failure counting with throttled logging and a cool-down
//!   circuit breaker (see [`HostFailureMap`]).
//!
//! `fetch` never fails loudly: `None` is a normal, expected outcome meaning
//! "source currently unreachable".

mod hosts;
pub mod limiter;
mod profiles;

use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use tracing::{debug, warn};
use url::Url;

use schemewatch_shared::{FetchPolicyConfig, Result, SchemeWatchError};

pub use hosts::{FailureNote, HostFailureMap};

use profiles::{BARE, FetchProfile, PROFILES};

// ---------------------------------------------------------------------------
// FetchedResponse
// ---------------------------------------------------------------------------

/// A successfully retrieved response with its body read eagerly.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    /// HTTP status code (always 2xx).
    pub status: u16,
    /// Lowercased `Content-Type` header value, empty if absent.
    pub content_type: String,
    /// Response body text.
    pub body: String,
    /// Final URL after redirects.
    pub url: String,
}

impl FetchedResponse {
    /// True when the response is a PDF document rather than a page.
    pub fn is_pdf(&self) -> bool {
        self.content_type.contains("pdf")
    }
}

// ---------------------------------------------------------------------------
// FetchGateway
// ---------------------------------------------------------------------------

/// Resilient URL retrieval with retry, profile rotation, and circuit breaking.
pub struct FetchGateway {
    client: Client,
    policy: FetchPolicyConfig,
    hosts: Arc<HostFailureMap>,
}

impl FetchGateway {
    /// Create a gateway sharing the given host-failure map.
    ///
    /// No default headers are set on the client — each attempt's profile
    /// controls the full header set, including the bare last-resort attempt.
    pub fn new(policy: FetchPolicyConfig, hosts: Arc<HostFailureMap>) -> Result<Self> {
        let client = Client::builder()
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| SchemeWatchError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            policy,
            hosts,
        })
    }

    /// Retrieve `url`, rotating through URL variants and header profiles.
    ///
    /// Returns `None` when the host is on cool-down or every attempt failed.
    /// Never returns an error: unreachable sources are an expected condition.
    pub async fn fetch(&self, url: &str) -> Option<FetchedResponse> {
        let host_key = host_key(url);

        if self.hosts.skip_active(&host_key) {
            warn!(host = %host_key, "skipping host temporarily due to repeated failures");
            return None;
        }

        let origin = Url::parse(url)
            .ok()
            .map(|u| u.origin().ascii_serialization());
        let threshold = self.policy.host_failure_threshold;
        let skip_window = Duration::from_secs(self.policy.host_skip_secs);
        let log_throttle = Duration::from_secs(self.policy.log_throttle_secs);

        let mut attempts: Vec<(String, FetchProfile)> = Vec::new();
        for variant in url_variants(url) {
            for profile in PROFILES {
                attempts.push((variant.clone(), *profile));
            }
        }
        attempts.push((url.to_string(), BARE));

        for (target, profile) in &attempts {
            // Best-effort HEAD: failures are ignored, some portals only
            // open up after a preflight request.
            let _ = self
                .send_with_retry(
                    Method::HEAD,
                    target,
                    profile,
                    origin.as_deref(),
                    Duration::from_secs(self.policy.head_timeout_secs),
                )
                .await;

            match self.attempt_get(target, profile, origin.as_deref()).await {
                Ok(fetched) => {
                    self.hosts.clear(&host_key);
                    debug!(url = %target, profile = profile.name, status = fetched.status, "fetch succeeded");
                    return Some(fetched);
                }
                Err(err) => {
                    let note = self.hosts.record_failure(
                        &host_key,
                        threshold,
                        skip_window,
                        log_throttle,
                    );
                    if note.should_log {
                        warn!(
                            url = %target,
                            profile = profile.name,
                            failures = note.count,
                            error = %err,
                            "fetch attempt failed"
                        );
                    }
                    if note.tripped {
                        warn!(host = %host_key, "host placed on cool-down after repeated failures");
                        return None;
                    }
                }
            }
        }

        warn!(%url, "giving up after exhausting all fetch attempts");
        None
    }

    /// One GET attempt: send with transport retry, require 2xx and a
    /// non-empty body.
    async fn attempt_get(
        &self,
        url: &str,
        profile: &FetchProfile,
        origin: Option<&str>,
    ) -> std::result::Result<FetchedResponse, AttemptError> {
        let response = self
            .send_with_retry(
                Method::GET,
                url,
                profile,
                origin,
                Duration::from_secs(self.policy.get_timeout_secs),
            )
            .await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(AttemptError::Transport)?;

        if body.trim().is_empty() {
            return Err(AttemptError::EmptyBody);
        }

        Ok(FetchedResponse {
            status,
            content_type,
            body,
            url: final_url,
        })
    }

    /// Send one request, retrying transient transport faults (timeout,
    /// connection reset) with exponential backoff, capped by policy.
    /// Non-2xx statuses are attempt failures, not transport faults.
    async fn send_with_retry(
        &self,
        method: Method,
        url: &str,
        profile: &FetchProfile,
        origin: Option<&str>,
        timeout: Duration,
    ) -> std::result::Result<reqwest::Response, AttemptError> {
        let mut attempt = 0u32;
        loop {
            let mut request = self.client.request(method.clone(), url).timeout(timeout);
            for (name, value) in profile.headers {
                request = request.header(*name, *value);
            }
            if profile.referer_origin {
                if let Some(origin) = origin {
                    request = request.header("Referer", origin);
                }
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(response),
                Ok(response) => return Err(AttemptError::Status(response.status())),
                Err(e) if attempt < self.policy.transport_retries && is_transient(&e) => {
                    attempt += 1;
                    debug!(%url, attempt, error = %e, "transient transport fault, backing off");
                    tokio::time::sleep(backoff_duration(attempt)).await;
                }
                Err(e) => return Err(AttemptError::Transport(e)),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Attempt plumbing
// ---------------------------------------------------------------------------

/// Why a single attempt failed; all variants roll up into the same
/// host-failure accounting.
#[derive(Debug)]
enum AttemptError {
    Transport(reqwest::Error),
    Status(StatusCode),
    EmptyBody,
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(e) => write!(f, "{e}"),
            AttemptError::Status(status) => write!(f, "HTTP {status}"),
            AttemptError::EmptyBody => write!(f, "empty body"),
        }
    }
}

/// Transport faults worth retrying beneath a single attempt.
fn is_transient(e: &reqwest::Error) -> bool {
    e.is_timeout() || e.is_connect()
}

/// Exponential backoff: 100ms · 2^attempt (200ms, 400ms, 800ms, ...).
fn backoff_duration(attempt: u32) -> Duration {
    Duration::from_millis(100 * 2u64.pow(attempt))
}

/// Hostname used as the failure-map key; unparseable URLs fall back to the
/// full URL string so they are still tracked.
fn host_key(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}

/// Raw URL plus its percent-encoded normalization when that differs.
fn url_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];
    if let Ok(parsed) = Url::parse(url) {
        let normalized = parsed.to_string();
        if normalized != url {
            variants.push(normalized);
        }
    }
    variants
}
