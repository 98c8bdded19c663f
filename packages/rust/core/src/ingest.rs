//! Authenticated delivery of canonical payloads to the downstream store.

use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, error, info};

use schemewatch_shared::{CanonicalPayload, Result, SchemeWatchError};

/// Per-request timeout for ingest POSTs.
const INGEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How much payload/body context goes into failure logs.
const NAME_LOG_CAP: usize = 80;
const BODY_LOG_CAP: usize = 400;

/// Downstream acknowledgment: `{ok: true, scheme: {...}, update: {...}}`.
#[derive(Debug, Default, Deserialize)]
pub struct IngestReceipt {
    #[serde(default)]
    pub ok: bool,
    #[serde(default)]
    pub scheme: serde_json::Value,
    #[serde(default)]
    pub update: serde_json::Value,
}

/// Outcome of one delivery attempt. Failure is non-fatal by contract —
/// the pipeline logs and continues.
#[derive(Debug)]
pub enum IngestOutcome {
    Delivered(IngestReceipt),
    Failed,
}

impl IngestOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, IngestOutcome::Delivered(_))
    }
}

/// Client for the downstream `POST /v1/ingest` endpoint.
pub struct IngestClient {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl IngestClient {
    pub fn new(url: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(INGEST_TIMEOUT)
            .build()
            .map_err(|e| SchemeWatchError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, url, token })
    }

    /// Deliver one payload. 2xx is success; any other outcome (4xx, 5xx,
    /// network failure) is logged with truncated payload context and
    /// reported as [`IngestOutcome::Failed`].
    pub async fn ingest(&self, payload: &CanonicalPayload) -> IngestOutcome {
        let name = truncate_chars(&payload.scheme_name, NAME_LOG_CAP);

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(payload)
            .send()
            .await;

        match response {
            Ok(resp) if resp.status().is_success() => {
                let receipt = match resp.json::<IngestReceipt>().await {
                    Ok(receipt) => receipt,
                    Err(e) => {
                        debug!(error = %e, "ingest acknowledged with unparseable body");
                        IngestReceipt::default()
                    }
                };
                info!(scheme = %name, "ingest ok");
                IngestOutcome::Delivered(receipt)
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                error!(
                    %status,
                    scheme = %name,
                    body = %truncate_chars(&body, BODY_LOG_CAP),
                    "ingest rejected"
                );
                IngestOutcome::Failed
            }
            Err(e) => {
                error!(scheme = %name, error = %e, "ingest request failed");
                IngestOutcome::Failed
            }
        }
    }
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use schemewatch_shared::{ChangeInfo, Severity, SourceRef};
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn payload(severity: Severity) -> CanonicalPayload {
        let now = Utc.with_ymd_and_hms(2025, 8, 1, 0, 0, 0).unwrap();
        CanonicalPayload {
            scheme_id: "agri-rss:test-scheme".into(),
            scheme_name: "Test scheme".into(),
            ministry: "Agriculture".into(),
            sector: String::new(),
            description: "desc".into(),
            eligibility: String::new(),
            benefits: String::new(),
            how_to_apply: String::new(),
            official_portal: "https://example.in".into(),
            sources: vec![SourceRef {
                source_id: "agri-rss".into(),
                source_url: "https://example.in".into(),
                fetched_at: now,
            }],
            status: "ongoing".into(),
            start_date: None,
            end_date: None,
            tags: Vec::new(),
            change: ChangeInfo {
                change_type: "notice".into(),
                summary: "Test scheme".into(),
                details: "desc".into(),
                effective_date: now,
                severity,
                auto_approve: severity.auto_approves(),
            },
        }
    }

    #[tokio::test]
    async fn delivers_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/ingest"))
            .and(header("authorization", "Bearer secret-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "ok": true,
                "scheme": {"scheme_id": "agri-rss:test-scheme"},
                "update": {"approved": true, "severity": "low"},
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = IngestClient::new(
            format!("{}/v1/ingest", server.uri()),
            "secret-token".into(),
        )
        .expect("client");

        let outcome = client.ingest(&payload(Severity::Low)).await;
        let IngestOutcome::Delivered(receipt) = outcome else {
            panic!("expected delivery");
        };
        assert!(receipt.ok);
        assert_eq!(receipt.update["approved"], serde_json::json!(true));
    }

    #[tokio::test]
    async fn low_severity_submits_auto_approve_indicator() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let client =
            IngestClient::new(server.uri(), "t".into()).expect("client");
        client.ingest(&payload(Severity::Low)).await;
        client.ingest(&payload(Severity::Medium)).await;
        client.ingest(&payload(Severity::High)).await;

        let bodies: Vec<serde_json::Value> = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .filter(|r| r.method.as_str() == "POST")
            .map(|r| serde_json::from_slice(&r.body).expect("json body"))
            .collect();
        assert_eq!(bodies.len(), 3);
        assert_eq!(bodies[0]["change"]["auto_approve"], serde_json::json!(true));
        assert!(bodies[1]["change"].get("auto_approve").is_none());
        assert!(bodies[2]["change"].get("auto_approve").is_none());
        assert_eq!(bodies[1]["change"]["severity"], serde_json::json!("medium"));
    }

    #[tokio::test]
    async fn rejection_is_a_non_fatal_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400).set_body_string(r#"{"error":"invalid payload"}"#),
            )
            .mount(&server)
            .await;

        let client = IngestClient::new(server.uri(), "t".into()).expect("client");
        assert!(!client.ingest(&payload(Severity::Low)).await.is_delivered());
    }

    #[tokio::test]
    async fn network_failure_is_a_non_fatal_failure() {
        // Nothing listens on this port
        let client =
            IngestClient::new("http://127.0.0.1:1/v1/ingest".into(), "t".into()).expect("client");
        assert!(!client.ingest(&payload(Severity::Low)).await.is_delivered());
    }

    #[tokio::test]
    async fn unparseable_ack_still_counts_as_delivered() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("created"))
            .mount(&server)
            .await;

        let client = IngestClient::new(server.uri(), "t".into()).expect("client");
        assert!(client.ingest(&payload(Severity::Low)).await.is_delivered());
    }
}
