//! RSS/Atom feed retrieval strategy.

use chrono::Utc;
use feed_rs::model::Entry;
use tracing::{info, warn};

use schemewatch_shared::{RawItem, Result, SchemeWatchError, SourceConfig};

use crate::Retrieval;

/// Fetch and parse a feed source, returning its most recent entries.
///
/// An unreachable feed is an empty result (the gateway already logged why);
/// a malformed feed is a parse error for the caller to log and skip.
pub async fn collect(source: &SourceConfig, ctx: &Retrieval) -> Result<Vec<RawItem>> {
    let Some(response) = ctx.gateway.fetch(&source.url).await else {
        warn!(source = %source.id, "feed unreachable, skipping source this run");
        return Ok(Vec::new());
    };

    let items = parse_feed(&response.body, ctx.max_items)?;
    info!(source = %source.id, items = items.len(), "parsed feed");
    Ok(items)
}

/// Parse a feed body into raw items, most recent first, truncated to
/// `max_items`. Entries without dates sort last in feed order.
pub(crate) fn parse_feed(body: &str, max_items: usize) -> Result<Vec<RawItem>> {
    let feed = feed_rs::parser::parse(body.as_bytes())
        .map_err(|e| SchemeWatchError::parse(format!("feed parse failed: {e}")))?;

    let mut items: Vec<RawItem> = feed.entries.into_iter().map(entry_to_item).collect();
    items.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    items.truncate(max_items);
    Ok(items)
}

fn entry_to_item(entry: Entry) -> RawItem {
    let url = entry
        .links
        .first()
        .map(|l| l.href.clone())
        .unwrap_or_default();

    let summary_text = entry
        .summary
        .map(|t| t.content)
        .or_else(|| entry.content.and_then(|c| c.body))
        .unwrap_or_default();

    RawItem {
        title: entry.title.map(|t| t.content).unwrap_or_default(),
        url,
        summary_text,
        published_at: entry
            .published
            .or(entry.updated)
            .map(|dt| dt.with_timezone(&Utc)),
        guid: (!entry.id.is_empty()).then_some(entry.id),
        categories: entry.categories.into_iter().map(|c| c.term).collect(),
        from_listing: false,
    }
}
