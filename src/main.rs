//! CLI entry point for the CDA.pl downloader.

use anyhow::Result;
use clap::Parser;
use tracing::{debug, info};

use cda_dl_core::{DownloadOptions, Downloader};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet flag > default (info)
    let default_level = if args.quiet { "warn" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    debug!(?args, "CLI arguments parsed");

    let options = DownloadOptions::new(
        args.directory,
        args.resolution,
        args.overwrite,
        args.threads,
        args.quiet,
    )?;

    let downloader = Downloader::new(args.urls, options, args.list_resolutions);
    let summary = downloader.run().await?;

    info!(
        completed = summary.completed,
        skipped = summary.skipped,
        failed = summary.failed,
        "run complete"
    );

    Ok(())
}
