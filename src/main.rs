//! digestpool - Concurrent, cancellable MD5 hashing of files and directories.
//!
//! Usage:
//!   digestpool PATH...               Hash files and directory trees
//!   digestpool -j 8 PATH...          Use an explicit worker count
//!   digestpool -f json PATH...       Print records and summary as JSON
//!   digestpool --help                Show help

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{ArgAction, Parser, ValueEnum};
use color_eyre::eyre::{Context, Result};
use serde::Serialize;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use digestpool_hash::{HashConfig, HashEvent, HashStatus, ResultRecord, RunSummary, Scheduler};

#[derive(Parser)]
#[command(
    name = "digestpool",
    version,
    about = "Concurrent, cancellable MD5 hashing of files and directory trees",
    long_about = "digestpool computes the MD5 digest of every regular file under the given \
                  paths using a fixed pool of worker threads.\n\n\
                  Results are printed as each file finishes, followed by a summary."
)]
struct Cli {
    /// Files and directories to hash
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Number of worker threads (clamped to the configured bounds)
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// Bytes read per chunk
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Do not follow symbolic links
    #[arg(long)]
    no_follow_symlinks: bool,

    /// Skip hidden files and directories
    #[arg(long)]
    skip_hidden: bool,

    /// Config file (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    records: &'a [ResultRecord],
    summary: &'a RunSummary,
}

fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = build_config(&cli)?;
    debug!(?config, "Effective configuration");
    let scheduler = Scheduler::new(config);

    let summary = match cli.format {
        OutputFormat::Text => run_text(&scheduler, &cli.paths)?,
        OutputFormat::Json => run_json(&scheduler, &cli.paths)?,
    };

    if summary.failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Install the stderr log subscriber.
///
/// `DIGESTPOOL_LOG` wins over `-v` when set.
fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_env("DIGESTPOOL_LOG")
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Load the config file and apply command-line overrides.
fn build_config(cli: &Cli) -> Result<HashConfig> {
    let mut config = match &cli.config {
        Some(path) => HashConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => HashConfig::load().context("Failed to load user config")?,
    };

    if let Some(workers) = cli.workers {
        config.workers = Some(workers);
    }
    if let Some(chunk_size) = cli.chunk_size {
        config.chunk_size = chunk_size;
    }
    if cli.no_follow_symlinks {
        config.follow_symlinks = false;
    }
    if cli.skip_hidden {
        config.include_hidden = false;
    }

    config.validate().context("Invalid options")?;
    Ok(config)
}

/// Print each record as it arrives, then the summary.
fn run_text(scheduler: &Scheduler, paths: &[PathBuf]) -> Result<RunSummary> {
    scheduler.on_progress(|event| {
        if let HashEvent::Record(update) = event {
            println!("{}", format_record(&update.record));
        }
    });

    let summary = scheduler.run(paths).context("Hash run failed")?;

    println!();
    println!("{}", "─".repeat(60));
    println!(
        " {} of {} files hashed ({}) in {}",
        summary.succeeded,
        summary.total,
        format_size(summary.bytes_hashed),
        format_duration(summary.elapsed)
    );
    println!(
        " {} failed, {} unreadable, {} workers",
        summary.failed, summary.unreadable, summary.workers
    );
    if summary.was_cancelled() {
        println!(
            " Cancelled: {} interrupted, {} not started",
            summary.cancelled, summary.skipped
        );
    }
    if summary.elapsed.as_secs_f64() > 0.0 && summary.bytes_hashed > 0 {
        println!(
            " Throughput: {}/s",
            format_size(summary.bytes_per_second() as u64)
        );
    }
    println!("{}", "─".repeat(60));

    Ok(summary)
}

/// Collect every record and print one JSON document.
fn run_json(scheduler: &Scheduler, paths: &[PathBuf]) -> Result<RunSummary> {
    let records = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&records);
    scheduler.on_progress(move |event| {
        if let (HashEvent::Record(update), Ok(mut records)) = (event, sink.lock()) {
            records.push(update.record.clone());
        }
    });

    let summary = scheduler.run(paths).context("Hash run failed")?;

    let mut records = records
        .lock()
        .map(|records| records.clone())
        .unwrap_or_default();
    records.sort_by_key(|r| r.sequence_index);

    let report = JsonReport {
        records: &records,
        summary: &summary,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(summary)
}

/// One output line: `<digest>  <size>  <duration>  <path>`, or the status label.
fn format_record(record: &ResultRecord) -> String {
    match (&record.status, &record.digest_hex) {
        (HashStatus::Success, Some(digest)) => format!(
            "{}  {:>10}  {:>9}  {}",
            digest,
            format_size(record.size_bytes.unwrap_or(0)),
            format_duration(record.duration),
            record.path.display()
        ),
        (status, _) => format!("{:<32}  {}", status.to_string(), record.path.display()),
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Format a duration as `32 ms`, `3.210 s`, `1 m 15 s` or `1 h 1 m`.
fn format_duration(duration: Duration) -> String {
    let millis = duration.as_millis();
    let secs = duration.as_secs();

    if millis < 1000 {
        format!("{millis} ms")
    } else if secs < 60 {
        format!("{}.{:03} s", secs, duration.subsec_millis())
    } else if secs < 3600 {
        format!("{} m {} s", secs / 60, secs % 60)
    } else {
        format!("{} h {} m", secs / 3600, (secs % 3600) / 60)
    }
}
