//! Shiori main entry point
//!
//! This is the command-line interface for the Shiori serial-novel harvester.

use anyhow::{bail, Context};
use clap::Parser;
use shiori::config::{load_config_with_hash, Config, MAX_CONCURRENCY};
use shiori::crawler::{Coordinator, HttpFetcher, Pacing, RunOptions};
use shiori::output::{print_report, write_export};
use shiori::storage::{FileStorage, ProgressStore};
use shiori::EntryKind;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Shiori: a resumable serial-novel harvester
///
/// Shiori discovers the chapters of a novel from its table of contents (or
/// by following "next chapter" links), orders them, and saves each chapter
/// plus a merged Markdown export. Interrupted runs can be resumed.
#[derive(Parser, Debug)]
#[command(name = "shiori")]
#[command(version)]
#[command(about = "A resumable serial-novel harvester", long_about = None)]
struct Cli {
    /// Table of contents or chapter URL to start from
    #[arg(value_name = "URL", required_unless_present = "export")]
    url: Option<String>,

    /// Path to TOML configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of chapters to acquire (0 = all)
    #[arg(short = 'n', long = "chapters", value_name = "N")]
    chapters: Option<usize>,

    /// Number of chapters fetched concurrently
    #[arg(
        short = 'p',
        long,
        value_name = "N",
        value_parser = clap::value_parser!(u32).range(1..=i64::from(MAX_CONCURRENCY))
    )]
    concurrency: Option<u32>,

    /// Randomized delay range between requests, in seconds
    #[arg(short, long, num_args = 2, value_names = ["MIN", "MAX"])]
    delay: Option<Vec<f64>>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Treat the URL as a chapter page
    #[arg(short = 'c', long, conflicts_with = "listing")]
    chapter: bool,

    /// Treat the URL as a table of contents
    #[arg(long, conflicts_with = "chapter")]
    listing: bool,

    /// Resume from the progress snapshot
    #[arg(short, long)]
    resume: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resolve and print the chapter list without downloading anything
    #[arg(long, conflicts_with = "export")]
    dry_run: bool,

    /// Re-export the merged document from the progress snapshot and exit
    #[arg(long, conflicts_with = "dry_run")]
    export: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load configuration {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            config
        }
        None => Config::default(),
    };

    let result = if cli.export {
        handle_export(&cli, &config)
    } else if cli.dry_run {
        handle_dry_run(&cli, &config).await
    } else {
        handle_run(&cli, &config).await
    };

    if let Err(e) = &result {
        tracing::error!("{:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("shiori=info,warn"),
            1 => EnvFilter::new("shiori=debug,info"),
            2 => EnvFilter::new("shiori=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn output_dir(cli: &Cli, config: &Config) -> PathBuf {
    cli.output
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.output.directory))
}

/// Merges configuration and command-line flags into run options
fn run_options(cli: &Cli, config: &Config) -> anyhow::Result<RunOptions> {
    let Some(url) = &cli.url else {
        bail!("a URL is required");
    };
    let entry = Url::parse(url).with_context(|| format!("invalid URL: {}", url))?;

    let mut options = RunOptions::from_config(entry, config)?;
    if let Some(chapters) = cli.chapters {
        options.chapter_budget = chapters;
    }
    if let Some(concurrency) = cli.concurrency {
        options.concurrency = concurrency as usize;
    }
    if let Some(delay) = &cli.delay {
        options.pacing = Pacing::new(delay[0], delay[1])?;
    }
    options.entry_kind = if cli.chapter {
        Some(EntryKind::Chapter)
    } else if cli.listing {
        Some(EntryKind::Listing)
    } else {
        None
    };
    options.resume = cli.resume;
    options.output_dir = output_dir(cli, config);

    Ok(options)
}

fn build_coordinator(cli: &Cli, config: &Config) -> anyhow::Result<Coordinator> {
    let options = run_options(cli, config)?;

    let timeout = Duration::from_secs(config.crawler.request_timeout_secs);
    let fetcher = HttpFetcher::new(&config.user_agent, timeout).context("failed to build HTTP client")?;
    let storage = FileStorage::new(&options.output_dir);
    let progress = ProgressStore::new(&config.output.progress_file);

    Ok(Coordinator::new(
        Arc::new(fetcher),
        Box::new(storage),
        progress,
        options,
    ))
}

/// Handles the --dry-run mode: resolves and prints the chapter list
async fn handle_dry_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let coordinator = build_coordinator(cli, config)?;
    let index = coordinator
        .preview()
        .await
        .context("could not resolve a chapter list")?;

    println!("=== Shiori Dry Run ===\n");
    println!("Novel: {}", index.novel_name);
    println!("Author: {}", index.author);
    println!("\nChapters ({}):", index.len());
    for (i, chapter) in index.ordered_chapters.iter().enumerate() {
        println!("  {:>4}. {} ({})", i + 1, chapter.title, chapter.location);
    }

    Ok(())
}

/// Handles the --export mode: rebuilds the merged document offline
fn handle_export(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let progress = ProgressStore::new(&config.output.progress_file);
    let Some(snapshot) = progress.load().context("failed to read progress snapshot")? else {
        bail!("no progress snapshot at {}", progress.path().display());
    };

    let path = write_export(
        &output_dir(cli, config),
        &snapshot.novel_name,
        &snapshot.author,
        &snapshot.chapters,
    )
    .context("failed to write export")?;

    println!("✓ Exported {} chapters to: {}", snapshot.chapters.len(), path.display());
    Ok(())
}

/// Handles the main acquisition run
async fn handle_run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let mut coordinator = build_coordinator(cli, config)?;
    let report = coordinator.run().await.context("run failed")?;

    if !cli.quiet {
        print_report(&report);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concurrency_within_range() {
        let cli = Cli::try_parse_from(["shiori", "https://example.com/b/1/", "-p", "4"]).unwrap();
        assert_eq!(cli.concurrency, Some(4));

        let cli = Cli::try_parse_from(["shiori", "https://example.com/b/1/", "-p", "64"]).unwrap();
        assert_eq!(cli.concurrency, Some(64));
    }

    #[test]
    fn test_concurrency_out_of_range_is_rejected() {
        assert!(Cli::try_parse_from(["shiori", "https://example.com/b/1/", "-p", "0"]).is_err());
        assert!(Cli::try_parse_from(["shiori", "https://example.com/b/1/", "-p", "10000"]).is_err());
    }

    #[test]
    fn test_oversized_delay_is_rejected() {
        let cli = Cli::try_parse_from([
            "shiori",
            "https://example.com/b/1/",
            "-d",
            "1e30",
            "1e31",
        ])
        .unwrap();

        assert!(run_options(&cli, &Config::default()).is_err());
    }
}
