//! schemewatch CLI — batch ingestion of government-scheme announcements.
//!
//! Crawls the configured sources once, normalizes what it finds, and
//! delivers new records to the downstream store.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
