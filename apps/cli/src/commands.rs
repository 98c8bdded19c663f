//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use schemewatch_core::{PipelineRunner, ProgressReporter};
use schemewatch_shared::{
    AppConfig, PipelineConfig, RunSummary, init_config, load_config, load_sources,
    validate_admin_token,
};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// schemewatch — keep a store of government schemes fresh from live sources.
#[derive(Parser)]
#[command(
    name = "schemewatch",
    version,
    about = "Ingest government-scheme announcements from RSS feeds and portal listings.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl all configured sources once and ingest new items.
    Run {
        /// Path to the sources file (JSON array).
        #[arg(long, default_value = "sources.json")]
        sources: PathBuf,

        /// Path to the durable seen-file.
        #[arg(long, default_value = "seen.json")]
        seen_file: PathBuf,

        /// Override the downstream ingest URL from config.
        #[arg(long)]
        ingest_url: Option<String>,

        /// Override the per-source item cap.
        #[arg(long)]
        max_items: Option<usize>,

        /// Override the per-source concurrency bound.
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// List and validate the configured sources.
    Sources {
        /// Path to the sources file (JSON array).
        #[arg(long, default_value = "sources.json")]
        sources: PathBuf,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "schemewatch=info",
        1 => "schemewatch=debug",
        _ => "schemewatch=trace",
    };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Run {
            sources,
            seen_file,
            ingest_url,
            max_items,
            concurrency,
        } => cmd_run(sources, seen_file, ingest_url, max_items, concurrency).await,
        Command::Sources { sources } => cmd_sources(&sources).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

async fn cmd_run(
    sources: PathBuf,
    seen_file: PathBuf,
    ingest_url: Option<String>,
    max_items: Option<usize>,
    concurrency: Option<usize>,
) -> Result<()> {
    let config = load_config()?;

    // Refuse to start unauthenticated — checked before any network activity
    let token = validate_admin_token(&config)?;

    let mut pipeline = PipelineConfig::from_app(&config, token, sources, seen_file);
    if let Some(url) = ingest_url {
        pipeline.ingest_url = url;
    }
    if let Some(n) = max_items {
        pipeline.max_items_per_source = n;
    }
    if let Some(n) = concurrency {
        pipeline.item_concurrency = n;
    }

    let runner = PipelineRunner::new(pipeline)?;

    info!(
        sources = runner.sources().len(),
        "starting ingestion run"
    );

    let reporter = CliProgress::new(runner.sources().len() as u64);
    let summary = runner.run(&reporter).await?;

    println!();
    println!("  Ingestion run complete");
    println!("  Sources processed: {}", summary.sources_processed);
    println!("  Sources skipped:   {}", summary.sources_skipped);
    println!("  Items discovered:  {}", summary.items_discovered);
    println!("  Items ingested:    {}", summary.items_ingested);
    println!("  Duplicates:        {}", summary.items_duplicate);
    println!("  Ingest failures:   {}", summary.ingest_failures);
    println!();

    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif bar over sources.
struct CliProgress {
    bar: ProgressBar,
}

impl CliProgress {
    fn new(total_sources: u64) -> Self {
        let bar = ProgressBar::new(total_sources);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{pos}/{len}] {msg}")
                .unwrap()
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        bar.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { bar }
    }
}

impl ProgressReporter for CliProgress {
    fn source_started(&self, id: &str, name: &str) {
        self.bar.set_message(format!("{name} ({id})"));
    }

    fn source_finished(&self, id: &str, ingested: usize, duplicates: usize, failures: usize) {
        self.bar.inc(1);
        self.bar.println(format!(
            "  {id}: {ingested} ingested, {duplicates} duplicate, {failures} failed"
        ));
    }

    fn done(&self, _summary: &RunSummary) {
        self.bar.finish_and_clear();
    }
}

// ---------------------------------------------------------------------------
// sources
// ---------------------------------------------------------------------------

async fn cmd_sources(path: &Path) -> Result<()> {
    let sources = load_sources(path)?;

    println!("{} source(s) in {}", sources.len(), path.display());
    for src in &sources {
        let strategy = match schemewatch_sources::dispatch(src) {
            schemewatch_sources::Strategy::Rss => "rss",
            schemewatch_sources::Strategy::HtmlListing => "html",
            schemewatch_sources::Strategy::TwoPhase => "two-phase",
        };
        println!("  {:<12} {:<10} {}", src.id, strategy, src.url);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// config
// ---------------------------------------------------------------------------

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
