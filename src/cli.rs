//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

use batchfetch_core::{DEFAULT_CONCURRENCY, DEFAULT_MAX_ATTEMPTS};

/// Batch download remote resources from URL lists.
///
/// Batchfetch reads URL/name rows from a plain list or a two-column
/// CSV/TSV file, downloads them concurrently with collision-safe naming,
/// and reports which URLs failed.
#[derive(Parser, Debug)]
#[command(name = "batchfetch")]
#[command(author, version, about)]
pub struct Args {
    /// Input file: URL list (one per line) or two-column .csv/.tsv (name, url)
    pub input: PathBuf,

    /// Optional names file paired line-by-line with a plain URL list
    #[arg(long)]
    pub names: Option<PathBuf>,

    /// Destination directory for downloaded files
    #[arg(short, long, default_value = "downloads")]
    pub output: PathBuf,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, default_value_t = DEFAULT_CONCURRENCY as u8, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: u8,

    /// Maximum attempts per download, including the first (1-10)
    #[arg(short = 'r', long, default_value_t = DEFAULT_MAX_ATTEMPTS as u8, value_parser = clap::value_parser!(u8).range(1..=10))]
    pub max_attempts: u8,

    /// Delay between retry attempts in milliseconds (0-60000)
    #[arg(long, default_value_t = 2000, value_parser = clap::value_parser!(u64).range(0..=60000))]
    pub retry_delay: u64,

    /// Extra static request header, formatted "Name: Value"
    #[arg(long, value_name = "HEADER")]
    pub header: Option<String>,

    /// Print the final summary as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}
