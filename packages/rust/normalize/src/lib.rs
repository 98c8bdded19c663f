//! Heuristic content normalization: raw retrieved items → canonical payloads.
//!
//! Announcement sources carry no structure, so every field is best-effort:
//! keyword-matched sentences for the scheme sections, windowed pattern
//! matching for lifecycle dates, and a deterministic slug identity when the
//! source provides none. No step here fails on malformed or missing input —
//! every miss degrades to an empty string or `None`.

pub mod dates;
pub mod sections;

use chrono::{DateTime, Utc};

use schemewatch_shared::{CanonicalPayload, ChangeInfo, RawItem, Severity, SourceConfig, SourceRef};

pub use dates::{END_KEYWORDS, START_KEYWORDS, extract_date};
pub use sections::{
    BENEFITS_KEYWORDS, ELIGIBILITY_KEYWORDS, HOW_TO_APPLY_KEYWORDS, extract_field,
};

/// Longest details text submitted downstream.
const DETAILS_CAP: usize = 4000;

/// Maximum tags carried over from feed categories.
const MAX_TAGS: usize = 8;

/// How much of the title participates in the derived identity.
const ID_TITLE_CAP: usize = 40;

/// Map one retrieved item into the canonical payload shape.
///
/// Infallible by design: a payload is always produced, however sparse the
/// input. `fetched_at` stamps the provenance entry and backstops a missing
/// publication date.
pub fn normalize(
    item: &RawItem,
    source: &SourceConfig,
    fetched_at: DateTime<Utc>,
) -> CanonicalPayload {
    let title = if item.title.trim().is_empty() {
        "Notice".to_string()
    } else {
        item.title.trim().to_string()
    };

    let scheme_id = item
        .guid
        .clone()
        .filter(|guid| !guid.is_empty())
        .unwrap_or_else(|| {
            format!("{}:{}", source.id, slugify(truncate_chars(&title, ID_TITLE_CAP)))
        });

    // Listing-derived items are labeled with their source; feed items keep
    // the headline as-is.
    let scheme_name = if item.from_listing {
        format!("{}: {}", source.name, title)
    } else {
        title.clone()
    };

    let description = item.summary_text.trim().to_string();

    let eligibility = extract_field(&description, ELIGIBILITY_KEYWORDS).unwrap_or_default();
    let benefits = extract_field(&description, BENEFITS_KEYWORDS).unwrap_or_default();
    let how_to_apply = extract_field(&description, HOW_TO_APPLY_KEYWORDS).unwrap_or_default();

    let start_date = extract_date(&description, START_KEYWORDS);
    let end_date = extract_date(&description, END_KEYWORDS);

    let status = status_heuristic(&description);

    let official_portal = if item.url.is_empty() {
        source.url.clone()
    } else {
        item.url.clone()
    };

    let tags: Vec<String> = item.categories.iter().take(MAX_TAGS).cloned().collect();

    let severity = Severity::default();

    CanonicalPayload {
        scheme_id,
        scheme_name,
        ministry: source
            .ministry
            .clone()
            .unwrap_or_else(|| source.name.clone()),
        sector: if item.from_listing {
            "Announcement".to_string()
        } else {
            String::new()
        },
        description: description.clone(),
        eligibility,
        benefits,
        how_to_apply,
        official_portal: official_portal.clone(),
        sources: vec![SourceRef {
            source_id: source.id.clone(),
            source_url: official_portal,
            fetched_at,
        }],
        status,
        start_date,
        end_date,
        tags,
        change: ChangeInfo {
            change_type: "notice".to_string(),
            summary: title,
            details: truncate_chars(&description, DETAILS_CAP).to_string(),
            effective_date: item.published_at.unwrap_or(fetched_at),
            severity,
            auto_approve: severity.auto_approves(),
        },
    }
}

/// Lifecycle status from launch/deadline phrases.
///
/// Both phrase families currently resolve to `ongoing`; the branches stay
/// separate so a future upcoming/closed split has a place to land.
fn status_heuristic(description: &str) -> String {
    let lower = description.to_lowercase();
    let mut status = "ongoing";
    if lower.contains("launch") || lower.contains("starts on") || lower.contains("from") {
        status = "ongoing";
    }
    if lower.contains("apply by")
        || lower.contains("last date")
        || lower.contains("ends on")
        || lower.contains("deadline")
    {
        status = "ongoing";
    }
    status.to_string()
}

/// Generate a URL-safe slug from a title.
fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Truncate to at most `max` characters on a char boundary.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
