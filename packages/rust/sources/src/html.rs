//! Generic HTML listing-page retrieval strategy.
//!
//! Government portals publish announcements as listing pages of anchors.
//! Anchor selection runs through a fixed, ordered cascade — most specific
//! press-release URL patterns first, "any anchor" last — stopping at the
//! first pattern that matches anything. Candidate links are then fetched
//! with bounded concurrency and reduced to raw items.

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use schemewatch_fetch::{FetchedResponse, limiter};
use schemewatch_shared::{RawItem, Result, SourceConfig};

use crate::{Retrieval, extract};

/// Ordered anchor-selector cascade. The bare `a` entry guarantees a match
/// on any page with links at all, at the cost of precision.
const ANCHOR_CASCADE: &[&str] = &[
    r#"a[href*="PressRelease"]"#,
    r#"a[href*="PressRelease.aspx"]"#,
    r#"a[href*="PressRelese"]"#,
    r#"a[href*="/press-release/"]"#,
    r#"a[href$=".pdf"]"#,
    "a",
];

/// One anchor selected from a listing page.
#[derive(Debug, Clone)]
pub(crate) struct Candidate {
    pub url: String,
    pub title: String,
}

/// Fetch a listing page and turn its candidate links into raw items.
pub async fn collect(source: &SourceConfig, ctx: &Retrieval) -> Result<Vec<RawItem>> {
    let Some(listing) = ctx.gateway.fetch(&source.url).await else {
        warn!(source = %source.id, "listing unreachable, skipping source this run");
        return Ok(Vec::new());
    };

    let candidates = select_candidates(&listing.body, &source.url, ctx.anchor_cap);
    info!(source = %source.id, anchors = candidates.len(), "listing anchors selected");

    Ok(fetch_candidates(ctx, candidates).await)
}

/// Run the anchor cascade over a listing body. Candidates are deduplicated
/// by resolved URL, in document order, capped at `cap`.
pub(crate) fn select_candidates(body: &str, base_url: &str, cap: usize) -> Vec<Candidate> {
    let doc = Html::parse_document(body);
    let base = Url::parse(base_url).ok();

    for selector in ANCHOR_CASCADE {
        let sel = Selector::parse(selector).expect("valid selector");
        let mut out: Vec<Candidate> = Vec::new();

        for el in doc.select(&sel) {
            let Some(href) = el.value().attr("href") else {
                continue;
            };
            let Some(resolved) = resolve_href(href, base.as_ref()) else {
                continue;
            };
            if out.iter().any(|c| c.url == resolved) {
                continue;
            }
            let text = el.text().collect::<String>().trim().to_string();
            out.push(Candidate {
                title: if text.is_empty() {
                    resolved.clone()
                } else {
                    text
                },
                url: resolved,
            });
        }

        if !out.is_empty() {
            out.truncate(cap);
            return out;
        }
    }

    Vec::new()
}

/// Fetch candidate detail pages concurrently (bounded) and build raw items.
///
/// Already-seen links are skipped before any network call; unreachable ones
/// are marked seen with `skipped` so later runs do not retry them forever.
pub(crate) async fn fetch_candidates(ctx: &Retrieval, candidates: Vec<Candidate>) -> Vec<RawItem> {
    let tasks: Vec<_> = candidates
        .into_iter()
        .filter(|c| {
            if ctx.dedup.has(&c.url) {
                debug!(url = %c.url, "candidate already seen");
                false
            } else {
                true
            }
        })
        .map(|candidate| {
            let gateway = ctx.gateway.clone();
            let dedup = ctx.dedup.clone();
            async move {
                let Some(page) = gateway.fetch(&candidate.url).await else {
                    if let Err(e) = dedup.mark_seen(&candidate.url, true) {
                        warn!(url = %candidate.url, error = %e, "failed to record skipped item");
                    }
                    return None;
                };
                Some(page_to_item(candidate, &page))
            }
        })
        .collect();

    limiter::run_all(ctx.item_concurrency, tasks)
        .await
        .into_iter()
        .flatten()
        .flatten()
        .collect()
}

/// Reduce one fetched detail page to a raw item, classifying by
/// content-type. PDFs short-circuit to a stub body.
pub(crate) fn page_to_item(candidate: Candidate, page: &FetchedResponse) -> RawItem {
    let (title, summary_text) = if page.is_pdf() {
        (candidate.title, format!("PDF link: {}", candidate.url))
    } else {
        let title = if candidate.title == candidate.url {
            extract::page_title(&page.body).unwrap_or(candidate.title)
        } else {
            candidate.title
        };
        (title, extract::page_text(&page.body))
    };

    RawItem {
        title,
        url: candidate.url,
        summary_text,
        published_at: None,
        guid: None,
        categories: Vec::new(),
        from_listing: true,
    }
}

fn resolve_href(href: &str, base: Option<&Url>) -> Option<String> {
    if href.starts_with("http://") || href.starts_with("https://") {
        return Some(href.to_string());
    }
    base?.join(href).ok().map(|u| u.to_string())
}
