//! End-to-end batch run: sources → fetch → normalize → dedup → ingest.
//!
//! Sources are processed strictly sequentially — one source's crawl fully
//! completes, including persistence of its dedup updates, before the next
//! begins. Within a source, item chains run concurrently under the limiter.
//! No failure escapes a single item's or source's processing path; the only
//! fatal conditions are configuration errors caught in [`PipelineRunner::new`]
//! before any network activity.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, instrument, warn};

use schemewatch_fetch::{FetchGateway, HostFailureMap, limiter};
use schemewatch_normalize::normalize;
use schemewatch_shared::{
    PipelineConfig, RawItem, Result, RunSummary, SchemeWatchError, SourceConfig, load_sources,
};
use schemewatch_sources::{Retrieval, collect_items};
use schemewatch_store::DedupStore;

use crate::ingest::IngestClient;

// ---------------------------------------------------------------------------
// Progress reporting
// ---------------------------------------------------------------------------

/// Progress callback for reporting run status to the CLI.
pub trait ProgressReporter: Send + Sync {
    /// Called when a source's crawl begins.
    fn source_started(&self, id: &str, name: &str);
    /// Called when a source's crawl (and its item chains) completed.
    fn source_finished(&self, id: &str, ingested: usize, duplicates: usize, failures: usize);
    /// Called once when the whole run is complete.
    fn done(&self, summary: &RunSummary);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn source_started(&self, _id: &str, _name: &str) {}
    fn source_finished(&self, _id: &str, _ingested: usize, _duplicates: usize, _failures: usize) {}
    fn done(&self, _summary: &RunSummary) {}
}

// ---------------------------------------------------------------------------
// PipelineRunner
// ---------------------------------------------------------------------------

/// Orchestrates one finite batch run over all configured sources.
pub struct PipelineRunner {
    config: PipelineConfig,
    sources: Vec<SourceConfig>,
    gateway: Arc<FetchGateway>,
    dedup: Arc<DedupStore>,
    ingest: Arc<IngestClient>,
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("sources", &self.sources.len())
            .finish_non_exhaustive()
    }
}

impl PipelineRunner {
    /// Resolve sources, open the seen-file, and construct the shared state
    /// objects (host-failure map, dedup store). Fails fast, before any
    /// network activity, on a missing token or unusable sources file.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        if config.admin_token.is_empty() {
            return Err(SchemeWatchError::config(
                "admin token must not be empty; refusing to run unauthenticated",
            ));
        }

        let sources = load_sources(&config.sources_file)?;
        let hosts = Arc::new(HostFailureMap::new());
        let gateway = Arc::new(FetchGateway::new(config.fetch.clone(), hosts)?);
        let dedup = Arc::new(DedupStore::load(&config.seen_file)?);
        let ingest = Arc::new(IngestClient::new(
            config.ingest_url.clone(),
            config.admin_token.clone(),
        )?);

        Ok(Self {
            config,
            sources,
            gateway,
            dedup,
            ingest,
        })
    }

    /// The sources this run will process, in order.
    pub fn sources(&self) -> &[SourceConfig] {
        &self.sources
    }

    /// Process every configured source once and return the run summary.
    #[instrument(skip_all, fields(sources = self.sources.len()))]
    pub async fn run(&self, progress: &dyn ProgressReporter) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        for source in &self.sources {
            progress.source_started(&source.id, &source.name);

            let ctx = Retrieval {
                gateway: self.gateway.clone(),
                dedup: self.dedup.clone(),
                max_items: self.config.max_items_per_source,
                item_concurrency: self.config.item_concurrency,
                anchor_cap: self.config.anchor_cap,
            };

            let items = match collect_items(source, &ctx).await {
                Ok(items) => items,
                Err(e) => {
                    warn!(source = %source.id, error = %e, "source failed, continuing with the rest");
                    summary.sources_skipped += 1;
                    progress.source_finished(&source.id, 0, 0, 0);
                    continue;
                }
            };

            if items.is_empty() {
                info!(source = %source.id, "no items this run");
                summary.sources_skipped += 1;
                progress.source_finished(&source.id, 0, 0, 0);
                continue;
            }

            summary.sources_processed += 1;
            summary.items_discovered += items.len();

            let tasks: Vec<_> = items
                .into_iter()
                .map(|item| {
                    let source = source.clone();
                    let dedup = self.dedup.clone();
                    let ingest = self.ingest.clone();
                    async move { process_item(item, &source, &dedup, &ingest).await }
                })
                .collect();

            let (mut ingested, mut duplicates, mut failures) = (0, 0, 0);
            let outcomes = limiter::run_all(self.config.item_concurrency, tasks).await;
            for outcome in outcomes.into_iter().flatten() {
                match outcome {
                    ItemOutcome::Ingested => ingested += 1,
                    ItemOutcome::Duplicate => duplicates += 1,
                    ItemOutcome::IngestFailed => failures += 1,
                }
            }

            summary.items_ingested += ingested;
            summary.items_duplicate += duplicates;
            summary.ingest_failures += failures;
            info!(source = %source.id, ingested, duplicates, failures, "source complete");
            progress.source_finished(&source.id, ingested, duplicates, failures);
        }

        info!(
            sources_processed = summary.sources_processed,
            sources_skipped = summary.sources_skipped,
            items_discovered = summary.items_discovered,
            items_duplicate = summary.items_duplicate,
            items_ingested = summary.items_ingested,
            ingest_failures = summary.ingest_failures,
            "pipeline run complete"
        );
        progress.done(&summary);

        Ok(summary)
    }
}

// ---------------------------------------------------------------------------
// Item processing
// ---------------------------------------------------------------------------

enum ItemOutcome {
    Ingested,
    Duplicate,
    IngestFailed,
}

/// One item chain: dedup check → normalize → ingest → mark seen + persist.
async fn process_item(
    item: RawItem,
    source: &SourceConfig,
    dedup: &DedupStore,
    ingest: &IngestClient,
) -> ItemOutcome {
    let key = item.dedup_key().to_string();
    if key.is_empty() || dedup.has(&key) {
        return ItemOutcome::Duplicate;
    }

    let payload = normalize(&item, source, Utc::now());
    let outcome = ingest.ingest(&payload).await;

    // Delivery failures still mark the item seen: at-most-once delivery,
    // so a later run will not retry this key.
    if let Err(e) = dedup.mark_seen(&key, false) {
        warn!(key = %key, error = %e, "failed to persist seen key");
    }

    if outcome.is_delivered() {
        ItemOutcome::Ingested
    } else {
        ItemOutcome::IngestFailed
    }
}
