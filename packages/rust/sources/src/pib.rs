//! Specialized two-phase strategy for the PIB press-release source.
//!
//! PIB nominally publishes a feed, but it is frequently empty or blocked.
//! Retrieval is modeled as an explicit state machine: try the feed first,
//! then a small ordered list of known HTML listing pages, terminal on the
//! first non-empty result or on exhaustion (source skipped this run).

use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

use schemewatch_shared::{RawItem, Result, SourceConfig};

use crate::html::{Candidate, fetch_candidates};
use crate::{Retrieval, rss};

/// Known press-release listing pages tried when the feed yields nothing.
const FALLBACK_LISTINGS: &[&str] = &[
    "https://pib.gov.in/PressRelese.aspx?MenuId=6",
    "https://pib.gov.in/pressreleasepage.aspx?PRID=1",
];

/// Href markers identifying press-release detail links on a listing page.
const DETAIL_MARKERS: &[&str] = &["PressReleseDetail.aspx", "PressRelease", "/press-release/"];

/// Retrieval phases for the two-phase strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    TryPrimary,
    TryFallback(usize),
    Exhausted,
}

/// Run the two-phase retrieval state machine for `source`.
pub async fn collect(source: &SourceConfig, ctx: &Retrieval) -> Result<Vec<RawItem>> {
    collect_with_fallbacks(source, ctx, FALLBACK_LISTINGS).await
}

/// State machine body, parameterized over the fallback listing URLs so the
/// transitions are exercisable against a local server.
pub(crate) async fn collect_with_fallbacks(
    source: &SourceConfig,
    ctx: &Retrieval,
    fallbacks: &[&str],
) -> Result<Vec<RawItem>> {
    let mut phase = Phase::TryPrimary;

    loop {
        match phase {
            Phase::TryPrimary => match try_feed(source, ctx).await {
                Ok(items) if !items.is_empty() => return Ok(items),
                Ok(_) => {
                    debug!(source = %source.id, "feed empty, moving to fallback listings");
                    phase = Phase::TryFallback(0);
                }
                Err(e) => {
                    warn!(source = %source.id, error = %e, "feed failed, moving to fallback listings");
                    phase = Phase::TryFallback(0);
                }
            },
            Phase::TryFallback(i) => {
                if i >= fallbacks.len() {
                    phase = Phase::Exhausted;
                    continue;
                }
                let listing_url = fallbacks[i];
                let items = try_listing(ctx, listing_url).await;
                if items.is_empty() {
                    debug!(source = %source.id, listing = listing_url, "fallback listing yielded nothing");
                    phase = Phase::TryFallback(i + 1);
                } else {
                    info!(source = %source.id, listing = listing_url, items = items.len(), "fallback listing succeeded");
                    return Ok(items);
                }
            }
            Phase::Exhausted => {
                warn!(source = %source.id, "all retrieval phases exhausted, skipping source this run");
                return Ok(Vec::new());
            }
        }
    }
}

/// Primary phase: the configured feed URL.
async fn try_feed(source: &SourceConfig, ctx: &Retrieval) -> Result<Vec<RawItem>> {
    let Some(response) = ctx.gateway.fetch(&source.url).await else {
        return Ok(Vec::new());
    };
    let items = rss::parse_feed(&response.body, ctx.max_items)?;
    if !items.is_empty() {
        info!(source = %source.id, items = items.len(), "feed yielded items");
    }
    Ok(items)
}

/// One fallback phase: a known listing page, filtered to detail links.
async fn try_listing(ctx: &Retrieval, listing_url: &str) -> Vec<RawItem> {
    let Some(listing) = ctx.gateway.fetch(listing_url).await else {
        return Vec::new();
    };

    let candidates = detail_candidates(&listing.body, listing_url, ctx.max_items);
    if candidates.is_empty() {
        return Vec::new();
    }
    fetch_candidates(ctx, candidates).await
}

/// Collect anchors whose href carries a press-release detail marker.
fn detail_candidates(body: &str, base_url: &str, cap: usize) -> Vec<Candidate> {
    let doc = Html::parse_document(body);
    let base = Url::parse(base_url).ok();
    let sel = Selector::parse("a").expect("valid selector");

    let mut out: Vec<Candidate> = Vec::new();
    for el in doc.select(&sel) {
        let Some(href) = el.value().attr("href") else {
            continue;
        };
        if !DETAIL_MARKERS.iter().any(|m| href.contains(m)) {
            continue;
        }
        let resolved = if href.starts_with("http") {
            href.to_string()
        } else {
            match base.as_ref().and_then(|b| b.join(href).ok()) {
                Some(u) => u.to_string(),
                None => continue,
            }
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
        if out.len() >= cap {
            break;
        }
    }
    out
}
