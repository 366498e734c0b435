//! CLI entry point for the batchfetch tool.

use std::process::ExitCode;

use anyhow::{Context, Result};
use batchfetch_core::{
    BatchOrchestrator, BatchSummary, HttpClient, RetryPolicy, TaskOutcome, read_rows,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

/// Exit code when the source file cannot be read or holds no usable rows.
const EXIT_SOURCE_ERROR: u8 = 2;

/// Exit code when one or more downloads failed.
const EXIT_PARTIAL_FAILURE: u8 = 1;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let rows = match read_rows(&args.input, args.names.as_deref()) {
        Ok(rows) => rows,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(ExitCode::from(EXIT_SOURCE_ERROR));
        }
    };

    for skipped in &rows.skipped {
        warn!(row = %skipped, "skipped unparseable row");
    }

    if rows.is_empty() {
        eprintln!("error: no valid rows in {}", args.input.display());
        return Ok(ExitCode::from(EXIT_SOURCE_ERROR));
    }

    info!(
        requests = rows.len(),
        skipped = rows.skipped_count(),
        output = %args.output.display(),
        "parsed input"
    );

    let client = match &args.header {
        Some(header) => HttpClient::with_extra_headers(parse_header(header)?),
        None => HttpClient::new(),
    };

    let retry_policy = RetryPolicy::new(
        u32::from(args.max_attempts),
        std::time::Duration::from_millis(args.retry_delay),
    );
    let orchestrator = BatchOrchestrator::new(usize::from(args.concurrency), retry_policy)?;

    let progress = if args.quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(rows.len() as u64);
        bar.set_style(
            ProgressStyle::with_template("[{bar:40}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar
    };

    let mut outcomes: Vec<TaskOutcome> = Vec::new();
    let summary = orchestrator
        .run_with_observer(rows.requests, &client, &args.output, |outcome| {
            progress.inc(1);
            if args.json {
                outcomes.push(outcome.clone());
            }
        })
        .await?;
    progress.finish_and_clear();

    if args.json {
        print_json_summary(&summary, &outcomes)?;
    } else {
        print_summary(&summary);
    }

    if summary.failed_count > 0 {
        return Ok(ExitCode::from(EXIT_PARTIAL_FAILURE));
    }
    Ok(ExitCode::SUCCESS)
}

/// Parses a "Name: Value" header flag into a single-entry header map.
fn parse_header(raw: &str) -> Result<HeaderMap> {
    let (name, value) = raw
        .split_once(':')
        .with_context(|| format!("header must be formatted \"Name: Value\", got: {raw}"))?;
    let name: HeaderName = name
        .trim()
        .parse()
        .with_context(|| format!("invalid header name in: {raw}"))?;
    let value: HeaderValue = value
        .trim()
        .parse()
        .with_context(|| format!("invalid header value in: {raw}"))?;
    let mut headers = HeaderMap::new();
    headers.insert(name, value);
    Ok(headers)
}

/// Prints the human-readable summary block.
fn print_summary(summary: &BatchSummary) {
    println!("==================================================");
    println!("Download summary:");
    println!("  succeeded: {}", summary.success_count);
    println!("  failed:    {}", summary.failed_count);
    println!("  total:     {}", summary.total());

    if !summary.failed_urls.is_empty() {
        println!();
        println!("Failed URLs:");
        for url in &summary.failed_urls {
            println!("  - {url}");
        }
    }
}

/// Prints the summary and per-task outcomes as JSON.
fn print_json_summary(summary: &BatchSummary, outcomes: &[TaskOutcome]) -> Result<()> {
    let report = serde_json::json!({
        "summary": summary,
        "outcomes": outcomes,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
