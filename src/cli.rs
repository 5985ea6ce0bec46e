//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use cda_dl_core::{BEST_RESOLUTION, DEFAULT_THREADS};

/// Download videos and folders from CDA.pl.
///
/// Folder URLs are crawled recursively, page by page; video URLs download
/// directly. Transfers resume from partial files left by interrupted runs.
#[derive(Parser, Debug)]
#[command(name = "cda-dl")]
#[command(author, version, about)]
pub struct Args {
    /// Destination directory for downloaded files
    #[arg(short = 'd', long, default_value = ".")]
    pub directory: PathBuf,

    /// Download videos in the given resolution (e.g. 480p)
    #[arg(short = 'r', long, default_value = BEST_RESOLUTION)]
    pub resolution: String,

    /// List available resolutions instead of downloading (videos only)
    #[arg(short = 'R', long = "resolutions")]
    pub list_resolutions: bool,

    /// Overwrite files that already exist
    #[arg(short = 'o', long)]
    pub overwrite: bool,

    /// Maximum concurrent transfers (must be greater than 0)
    #[arg(short = 't', long, default_value_t = DEFAULT_THREADS)]
    pub threads: usize,

    /// Suppress progress bars and non-warning output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Video/folder URL(s) to download
    #[arg(value_name = "URL", required = true)]
    pub urls: Vec<String>,
}
