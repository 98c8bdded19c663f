//! Core domain types for the schemewatch ingestion pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// SourceConfig
// ---------------------------------------------------------------------------

/// Retrieval strategy selector for a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// RSS/Atom feed.
    Rss,
    /// HTML listing page (press releases, notice boards).
    Html,
    /// Two-phase source: feed first, known listing pages as fallback.
    Specialized,
}

/// One entry of the sources file. Loaded once per run; immutable during it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Stable source identifier (e.g., `pib-agri`).
    pub id: String,
    /// Human-readable source name.
    pub name: String,
    /// Feed or listing URL.
    pub url: String,
    /// Which retrieval strategy handles this source.
    pub kind: SourceKind,
    /// Ministry label attached to normalized records, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ministry: Option<String>,
}

// ---------------------------------------------------------------------------
// RawItem
// ---------------------------------------------------------------------------

/// A single retrieved announcement before normalization. Transient.
#[derive(Debug, Clone, Default)]
pub struct RawItem {
    /// Item headline.
    pub title: String,
    /// Canonical link to the announcement (may be empty for odd feeds).
    pub url: String,
    /// Best-available body text: feed summary or extracted page text.
    pub summary_text: String,
    /// Publication timestamp, when the source provides one.
    pub published_at: Option<DateTime<Utc>>,
    /// Feed GUID, when distinct from the link.
    pub guid: Option<String>,
    /// Feed category terms; become payload tags.
    pub categories: Vec<String>,
    /// True for items discovered via an HTML listing page rather than a feed.
    pub from_listing: bool,
}

impl RawItem {
    /// Deduplication key: link, else guid, else title.
    pub fn dedup_key(&self) -> &str {
        if !self.url.is_empty() {
            &self.url
        } else if let Some(guid) = self.guid.as_deref() {
            guid
        } else {
            &self.title
        }
    }
}

// ---------------------------------------------------------------------------
// Severity
// ---------------------------------------------------------------------------

/// Coarse urgency label on an update; drives downstream auto-approval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Low-severity updates are auto-approved downstream.
    pub fn auto_approves(self) -> bool {
        matches!(self, Severity::Low)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        };
        write!(f, "{s}")
    }
}

// ---------------------------------------------------------------------------
// CanonicalPayload
// ---------------------------------------------------------------------------

/// Provenance entry attached to a canonical record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceRef {
    /// Id of the configured source this item came from.
    pub source_id: String,
    /// URL the item was retrieved from.
    pub source_url: String,
    /// Retrieval timestamp.
    pub fetched_at: DateTime<Utc>,
}

/// Update-specific information carried alongside the scheme record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeInfo {
    /// Kind of change: currently always `notice`.
    pub change_type: String,
    /// One-line summary (the item title).
    pub summary: String,
    /// Full details text, truncated upstream.
    pub details: String,
    /// When the change takes effect (publication date or fetch time).
    pub effective_date: DateTime<Utc>,
    /// Urgency label; `low` auto-approves downstream.
    pub severity: Severity,
    /// Auto-approval indicator submitted with the payload.
    /// Present and `true` only for low severity.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub auto_approve: bool,
}

/// The normalized scheme/update record expected by the downstream store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalPayload {
    pub scheme_id: String,
    pub scheme_name: String,
    pub ministry: String,
    pub sector: String,
    pub description: String,
    pub eligibility: String,
    pub benefits: String,
    pub how_to_apply: String,
    pub official_portal: String,
    pub sources: Vec<SourceRef>,
    /// Lifecycle status; heuristic, defaults to `ongoing`.
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    pub change: ChangeInfo,
}

// ---------------------------------------------------------------------------
// RunSummary
// ---------------------------------------------------------------------------

/// Per-run counters, logged once at the end of a pipeline run.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunSummary {
    /// Sources that yielded at least one item.
    pub sources_processed: usize,
    /// Sources skipped after strategy exhaustion or fatal per-source errors.
    pub sources_skipped: usize,
    /// Raw items produced by all strategies.
    pub items_discovered: usize,
    /// Items suppressed by the dedup store.
    pub items_duplicate: usize,
    /// Items delivered downstream with a 2xx response.
    pub items_ingested: usize,
    /// Items whose ingest POST failed (still marked seen).
    pub ingest_failures: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_kind_parses_lowercase() {
        let src: SourceConfig = serde_json::from_str(
            r#"{"id":"agri-rss","name":"Agri News","url":"https://example.in/rss","kind":"rss"}"#,
        )
        .expect("parse source");
        assert_eq!(src.kind, SourceKind::Rss);
        assert!(src.ministry.is_none());
    }

    #[test]
    fn unknown_source_kind_rejected() {
        let result = serde_json::from_str::<SourceConfig>(
            r#"{"id":"x","name":"X","url":"https://example.in","kind":"ftp"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn dedup_key_prefers_link_then_guid_then_title() {
        let mut item = RawItem {
            title: "New irrigation subsidy".into(),
            url: "https://example.in/notice/1".into(),
            guid: Some("guid-1".into()),
            ..Default::default()
        };
        assert_eq!(item.dedup_key(), "https://example.in/notice/1");

        item.url.clear();
        assert_eq!(item.dedup_key(), "guid-1");

        item.guid = None;
        assert_eq!(item.dedup_key(), "New irrigation subsidy");
    }

    #[test]
    fn severity_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Severity::Low).unwrap(), r#""low""#);
        assert_eq!(serde_json::to_string(&Severity::High).unwrap(), r#""high""#);
        let parsed: Severity = serde_json::from_str(r#""medium""#).unwrap();
        assert_eq!(parsed, Severity::Medium);
    }

    #[test]
    fn auto_approve_omitted_when_false() {
        let change = ChangeInfo {
            change_type: "notice".into(),
            summary: "t".into(),
            details: String::new(),
            effective_date: Utc::now(),
            severity: Severity::Medium,
            auto_approve: false,
        };
        let json = serde_json::to_value(&change).unwrap();
        assert!(json.get("auto_approve").is_none());

        let change = ChangeInfo {
            severity: Severity::Low,
            auto_approve: true,
            ..change
        };
        let json = serde_json::to_value(&change).unwrap();
        assert_eq!(json["auto_approve"], serde_json::json!(true));
    }
}
