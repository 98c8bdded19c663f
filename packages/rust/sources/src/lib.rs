//! Per-source retrieval strategies and dispatch.
//!
//! Each configured source routes to one strategy: RSS/Atom feeds, generic
//! HTML listing pages, or the specialized two-phase PIB handler. One
//! distinguished source id always takes the two-phase path regardless of
//! its declared kind. A failing source never aborts other sources — every
//! strategy degrades to an empty item list or a loggable parse error.

mod extract;
pub mod html;
pub mod pib;
pub mod rss;

use std::sync::Arc;

use schemewatch_fetch::FetchGateway;
use schemewatch_shared::{RawItem, Result, SourceConfig, SourceKind};
use schemewatch_store::DedupStore;

/// Source id routed to the specialized two-phase strategy regardless of kind.
pub const SPECIALIZED_SOURCE_ID: &str = "pib-agri";

/// Shared handles and limits every strategy needs.
#[derive(Clone)]
pub struct Retrieval {
    pub gateway: Arc<FetchGateway>,
    pub dedup: Arc<DedupStore>,
    /// Maximum items taken from one source per run.
    pub max_items: usize,
    /// Concurrency bound for detail-page fetches within one source.
    pub item_concurrency: usize,
    /// Maximum candidate anchors taken from one listing page.
    pub anchor_cap: usize,
}

/// Which strategy handles a source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Rss,
    HtmlListing,
    TwoPhase,
}

/// Pick the retrieval strategy for a source.
pub fn dispatch(source: &SourceConfig) -> Strategy {
    if source.id == SPECIALIZED_SOURCE_ID {
        return Strategy::TwoPhase;
    }
    match source.kind {
        SourceKind::Rss => Strategy::Rss,
        SourceKind::Html => Strategy::HtmlListing,
        SourceKind::Specialized => Strategy::TwoPhase,
    }
}

/// Execute the matching strategy for `source` and return its raw items.
pub async fn collect_items(source: &SourceConfig, ctx: &Retrieval) -> Result<Vec<RawItem>> {
    match dispatch(source) {
        Strategy::Rss => rss::collect(source, ctx).await,
        Strategy::HtmlListing => html::collect(source, ctx).await,
        Strategy::TwoPhase => pib::collect(source, ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemewatch_fetch::HostFailureMap;
    use schemewatch_shared::FetchPolicyConfig;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn source(id: &str, url: String, kind: SourceKind) -> SourceConfig {
        SourceConfig {
            id: id.into(),
            name: "Test Source".into(),
            url,
            kind,
            ministry: None,
        }
    }

    fn retrieval(dedup_dir: &std::path::Path) -> Retrieval {
        let policy = FetchPolicyConfig {
            get_timeout_secs: 5,
            head_timeout_secs: 2,
            transport_retries: 0,
            ..FetchPolicyConfig::default()
        };
        let gateway =
            FetchGateway::new(policy, Arc::new(HostFailureMap::new())).expect("gateway");
        let dedup = DedupStore::load(&dedup_dir.join("seen.json")).expect("store");
        Retrieval {
            gateway: Arc::new(gateway),
            dedup: Arc::new(dedup),
            max_items: 40,
            item_concurrency: 6,
            anchor_cap: 80,
        }
    }

    const FEED: &str = r#"<?xml version="1.0"?>
<rss version="2.0"><channel><title>Updates</title>
  <item>
    <title>Crop insurance window opens</title>
    <link>https://news.example.in/pmfby-2025</link>
    <description>How to apply: visit the portal.</description>
    <pubDate>Wed, 02 Jul 2025 06:00:00 GMT</pubDate>
  </item>
  <item>
    <title>PM-KISAN instalment released</title>
    <link>https://news.example.in/pm-kisan-19</link>
    <description>Benefit amount credited.</description>
    <pubDate>Tue, 01 Jul 2025 06:00:00 GMT</pubDate>
  </item>
</channel></rss>"#;

    #[test]
    fn specialized_id_overrides_kind() {
        let src = source(SPECIALIZED_SOURCE_ID, "https://pib.gov.in/rss.aspx".into(), SourceKind::Rss);
        assert_eq!(dispatch(&src), Strategy::TwoPhase);

        let src = source("agri-rss", "https://x.in/rss".into(), SourceKind::Rss);
        assert_eq!(dispatch(&src), Strategy::Rss);

        let src = source("agricoop", "https://x.in/press".into(), SourceKind::Html);
        assert_eq!(dispatch(&src), Strategy::HtmlListing);
    }

    #[tokio::test]
    async fn rss_source_collects_items() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source("agri-rss", format!("{}/feed", server.uri()), SourceKind::Rss);

        let items = collect_items(&src, &ctx).await.expect("collect");
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].title, "Crop insurance window opens");
    }

    #[tokio::test]
    async fn html_listing_fetches_details() {
        let server = MockServer::start().await;
        let listing = format!(
            r#"<html><body>
                <a href="{0}/PressRelease.aspx?PRID=1">Notice one</a>
                <a href="{0}/PressRelease.aspx?PRID=2">Notice two</a>
                <a href="{0}/Home.aspx">Home</a>
            </body></html>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/press"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/PressRelease.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><div id="content">Deadline: 31st July 2025.</div></body></html>"#,
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source("agricoop", format!("{}/press", server.uri()), SourceKind::Html);

        let mut items = collect_items(&src, &ctx).await.expect("collect");
        items.sort_by(|a, b| a.url.cmp(&b.url));
        assert_eq!(items.len(), 2);
        assert!(items[0].from_listing);
        assert_eq!(items[0].summary_text, "Deadline: 31st July 2025.");
        assert_eq!(items[0].title, "Notice one");
    }

    #[tokio::test]
    async fn html_listing_skips_already_seen_candidates() {
        let server = MockServer::start().await;
        let seen_url = format!("{}/PressRelease.aspx?PRID=1", server.uri());
        let listing = format!(
            r#"<a href="{seen_url}">Old</a><a href="{}/PressRelease.aspx?PRID=2">New</a>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/press"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/PressRelease.aspx"))
            .and(query_param("PRID", "2"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string("<html><body><div id=\"content\">Fresh</div></body></html>"),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        ctx.dedup.mark_seen(&seen_url, false).expect("pre-seed");

        let src = source("agricoop", format!("{}/press", server.uri()), SourceKind::Html);
        let items = collect_items(&src, &ctx).await.expect("collect");
        assert_eq!(items.len(), 1);
        assert!(items[0].url.ends_with("PRID=2"));
        // The seen candidate was never fetched
        let fetched_seen = server
            .received_requests()
            .await
            .unwrap_or_default()
            .iter()
            .any(|r| r.url.query() == Some("PRID=1") && r.method.as_str() == "GET");
        assert!(!fetched_seen);
    }

    #[tokio::test]
    async fn failing_listing_yields_no_items_and_no_crash() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("HEAD"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source("agricoop", format!("{}/press", server.uri()), SourceKind::Html);

        let items = collect_items(&src, &ctx).await.expect("collect");
        assert!(items.is_empty());
        assert!(ctx.dedup.is_empty());
    }

    #[tokio::test]
    async fn unreachable_detail_page_is_marked_skipped() {
        let server = MockServer::start().await;
        let detail_url = format!("{}/PressRelease.aspx?PRID=7", server.uri());
        Mock::given(method("GET"))
            .and(path("/press"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(format!(r#"<a href="{detail_url}">Gone</a>"#)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/PressRelease.aspx"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source("agricoop", format!("{}/press", server.uri()), SourceKind::Html);

        let items = collect_items(&src, &ctx).await.expect("collect");
        assert!(items.is_empty());
        assert!(ctx.dedup.has(&detail_url));
    }

    #[tokio::test]
    async fn two_phase_falls_back_to_listing() {
        let server = MockServer::start().await;
        // Feed endpoint is blocked
        Mock::given(method("GET"))
            .and(path("/rss.aspx"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let listing = format!(
            r#"<html><body><a href="{}/PressReleseDetail.aspx?PRID=9">Cabinet notice</a></body></html>"#,
            server.uri()
        );
        Mock::given(method("GET"))
            .and(path("/PressRelese.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(listing))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/PressReleseDetail.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"<html><body><div class="press-release">Full text of the notice.</div></body></html>"#,
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source(
            SPECIALIZED_SOURCE_ID,
            format!("{}/rss.aspx", server.uri()),
            SourceKind::Specialized,
        );

        let fallback = format!("{}/PressRelese.aspx?MenuId=6", server.uri());
        let items = pib::collect_with_fallbacks(&src, &ctx, &[&fallback])
            .await
            .expect("collect");
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Cabinet notice");
        assert_eq!(items[0].summary_text, "Full text of the notice.");
    }

    #[tokio::test]
    async fn two_phase_prefers_feed_when_it_works() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/rss.aspx"))
            .respond_with(ResponseTemplate::new(200).set_body_string(FEED))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source(
            SPECIALIZED_SOURCE_ID,
            format!("{}/rss.aspx", server.uri()),
            SourceKind::Specialized,
        );

        let items = pib::collect_with_fallbacks(&src, &ctx, &["http://127.0.0.1:1/unused"])
            .await
            .expect("collect");
        assert_eq!(items.len(), 2);
        assert!(!items[0].from_listing);
    }

    #[tokio::test]
    async fn two_phase_exhaustion_skips_source() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().expect("tempdir");
        let ctx = retrieval(dir.path());
        let src = source(
            SPECIALIZED_SOURCE_ID,
            format!("{}/rss.aspx", server.uri()),
            SourceKind::Specialized,
        );

        let fallback = format!("{}/PressRelese.aspx", server.uri());
        let items = pib::collect_with_fallbacks(&src, &ctx, &[&fallback])
            .await
            .expect("collect");
        assert!(items.is_empty());
    }
}
