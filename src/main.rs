//! CLI entry point for the media downloader.

use std::collections::HashSet;
use std::io::{self, IsTerminal, Read};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use media_downloader::{Downloader, ErrorReport, HttpClient, ProviderRegistry};
use tracing::{debug, info, warn};
use url::Url;

mod cli;
mod config;
mod progress_bar;

use cli::Args;
use config::{Settings, VerbositySetting};

/// Exit status when at least one page reported errors.
const EXIT_WITH_ERRORS: u8 = 2;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let file_config = config::load_file_config(args.config.as_deref())?;
    let settings = Settings::merge(&args, &file_config);

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config file > default (info)
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(settings.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    debug!(?args, ?settings, "configuration resolved");

    let input_text = if !args.urls.is_empty() {
        args.urls.join("\n")
    } else if !io::stdin().is_terminal() {
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read page URLs from stdin")?;
        buffer
    } else {
        info!("No input provided. Pipe page URLs via stdin or pass them as arguments.");
        info!("Example: echo 'https://nhentai.net/g/123456/' | media-downloader -o ./comics");
        return Ok(ExitCode::SUCCESS);
    };

    let pages = parse_page_urls(&input_text);
    if pages.is_empty() {
        info!("No valid page URLs found in input");
        return Ok(ExitCode::SUCCESS);
    }

    let client = HttpClient::with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs)
        .context("Failed to build HTTP client")?;
    let registry = ProviderRegistry::with_defaults(client.clone(), None);
    let downloader = Downloader::new(client, registry, settings.concurrency)?;

    let show_bar = settings.verbosity != VerbositySetting::Quiet && io::stderr().is_terminal();
    let bar = progress_bar::spawn_progress_bar(show_bar, downloader.subscribe());

    info!(
        pages = pages.len(),
        output_dir = %settings.output_dir.display(),
        concurrency = settings.concurrency,
        "starting downloads"
    );
    let outcome = downloader
        .download_all_with_stats(&pages, &settings.output_dir)
        .await;

    // Dropping the downloader closes the progress stream.
    drop(downloader);
    if let Some(handle) = bar {
        let _ = handle.await;
    }

    print_report(&outcome.report);
    info!(
        files = outcome.stats.dequeued,
        succeeded = outcome.stats.succeeded,
        failed = outcome.stats.failed,
        pages_with_errors = outcome.report.len(),
        "Download complete"
    );

    if outcome.report.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::from(EXIT_WITH_ERRORS))
    }
}

/// One URL per line; blank and `#` lines are ignored, duplicates dropped.
fn parse_page_urls(input: &str) -> Vec<Url> {
    let mut seen = HashSet::new();
    let mut pages = Vec::new();
    for line in input.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match Url::parse(line) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {
                if seen.insert(url.clone()) {
                    pages.push(url);
                } else {
                    debug!(url = %url, "skipping duplicate page URL");
                }
            }
            Ok(url) => warn!(url = %url, "Skipped page URL with unsupported scheme"),
            Err(e) => warn!(input = line, error = %e, "Skipped unparsable page URL"),
        }
    }
    pages
}

fn print_report(report: &ErrorReport) {
    for (page, messages) in report.iter() {
        eprintln!("Errors for {page}:");
        for message in messages {
            eprintln!("  - {message}");
        }
    }
}
