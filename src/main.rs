//! Pagebatch main entry point
//!
//! This is the command-line interface for the Pagebatch batch orchestrator.

use anyhow::Context;
use clap::Parser;
use pagebatch::config::{load_config_with_hash, Config, ConfigOverrides};
use pagebatch::crawler::{run_batches, RunControl};
use pagebatch::state::GlobalCheckpoint;
use pagebatch::storage::{open_store, CheckpointStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Pagebatch: a resumable batch orchestrator for paginated crawls
///
/// Pagebatch splits a page range into fixed-size batches, runs an external
/// crawl command for each, pauses while the host is under memory or disk
/// pressure, and checkpoints after every batch so an interrupted run picks
/// up exactly where it stopped.
#[derive(Parser, Debug)]
#[command(name = "pagebatch")]
#[command(version = "1.0.0")]
#[command(about = "A resumable batch orchestrator for paginated crawls", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Resume an interrupted run; fails if no checkpoint exists
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Start a fresh run, discarding previous progress
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Validate config and show the batch plan without running anything
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the output directory and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Total number of pages in the source
    #[arg(long, value_name = "N")]
    total_pages: Option<u64>,

    /// Pages handed to the crawl command per batch
    #[arg(long, value_name = "N")]
    pages_per_batch: Option<u64>,

    /// Products per output file, passed through to the crawl command
    #[arg(long, value_name = "N")]
    batch_size: Option<u64>,

    /// Directory for checkpoints, summaries and batch output
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Disable memory and disk pressure checks
    #[arg(long)]
    no_resource_check: bool,

    /// Seconds to wait before re-checking resources while paused
    #[arg(long, value_name = "SECS")]
    pause_secs: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            total_pages: self.total_pages,
            pages_per_batch: self.pages_per_batch,
            batch_size: self.batch_size,
            output_dir: self.output_dir.clone(),
            resource_pause_secs: self.pause_secs,
            disable_resource_check: self.no_resource_check,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config, &cli.overrides())
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    // Handle different modes
    if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_run(config, config_hash, cli.fresh, cli.resume).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("pagebatch=info,warn"),
            1 => EnvFilter::new("pagebatch=debug,info"),
            2 => EnvFilter::new("pagebatch=trace,debug"),
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

/// Reads the checkpoint without creating the output directory
fn existing_checkpoint(config: &Config) -> anyhow::Result<Option<GlobalCheckpoint>> {
    if !config.run.output_dir.exists() {
        return Ok(None);
    }
    let store = open_store(&config.run.output_dir)?;
    Ok(store.load_global()?)
}

/// Fails unless there is a checkpoint to resume from
fn require_checkpoint(config: &Config) -> anyhow::Result<()> {
    if existing_checkpoint(config)?.is_none() {
        anyhow::bail!(
            "--resume given but no checkpoint exists in {}",
            config.run.output_dir.display()
        );
    }
    Ok(())
}

/// Handles the --dry-run mode: validates config and shows the batch plan
fn handle_dry_run(config: &Config) -> anyhow::Result<()> {
    println!("=== Pagebatch Dry Run ===\n");

    println!("Run Configuration:");
    println!("  Total pages: {}", config.run.total_pages);
    println!("  Pages per batch: {}", config.run.pages_per_batch);
    println!("  Batch size: {}", config.run.batch_size);
    println!("  Output directory: {}", config.run.output_dir.display());
    println!("  Inter-batch pause: {}s", config.run.inter_batch_pause_secs);
    println!(
        "  Attempts per batch: {} ({}s between attempts)",
        config.run.max_batch_attempts, config.run.retry_delay_secs
    );
    println!("  Stop policy: {:?}", config.run.stop_policy);

    println!("\nResources:");
    if config.resources.enabled {
        println!("  Max memory: {}%", config.resources.max_memory_percent);
        println!("  Max disk: {}%", config.resources.max_disk_percent);
        println!("  Re-check every: {}s", config.resources.pause_secs);
    } else {
        println!("  Monitoring disabled");
    }

    println!("\nCrawl Command:");
    println!("  {} {}", config.executor.program, config.executor.args.join(" "));
    println!("  Result file: {}", config.executor.result_file);

    let checkpoint = existing_checkpoint(config)?;
    let (next_offset, next_batch) = match &checkpoint {
        Some(checkpoint) => (checkpoint.next_offset, checkpoint.next_batch_number()),
        None => (0, 1),
    };
    let batches = pagebatch::plan(
        config.run.total_pages,
        config.run.pages_per_batch,
        next_offset,
        next_batch,
    )?;

    println!("\nPlan ({} batches from offset {}):", batches.len(), next_offset);
    for batch in &batches {
        println!(
            "  - batch {:>5}: pages {}-{} ({} pages)",
            batch.batch_number,
            batch.start_offset,
            batch.end_offset,
            batch.page_count()
        );
    }

    println!("\n✓ Configuration is valid");
    if checkpoint.is_some() {
        println!("✓ Would resume at offset {}", next_offset);
    } else {
        println!("✓ Would start a new run");
    }

    Ok(())
}

/// Handles the --stats mode: shows statistics from the output directory
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    use pagebatch::output::{load_statistics, print_statistics};

    println!("Output directory: {}\n", config.run.output_dir.display());

    let store = open_store(&config.run.output_dir)?;
    let (stats, checkpoint) = load_statistics(&store)?;
    print_statistics(&stats, checkpoint.as_ref(), config.run.total_pages);

    Ok(())
}

/// Handles the main batch run
async fn handle_run(
    config: Config,
    config_hash: String,
    fresh: bool,
    resume: bool,
) -> anyhow::Result<()> {
    if fresh {
        tracing::info!("Starting fresh run (discarding previous progress)");
    } else if resume {
        require_checkpoint(&config)?;
        tracing::info!("Resuming run from existing checkpoint");
    } else {
        tracing::info!("Starting run (will resume if a checkpoint exists)");
    }

    let control = RunControl::new();
    control.register_handlers();

    let outcome = run_batches(config, Some(config_hash), fresh, control)
        .await
        .context("Run failed; rerun to resume from the last checkpoint")?;

    if outcome.is_complete() {
        tracing::info!("Run completed successfully");
    } else {
        tracing::info!(
            "Run stopped at offset {}; rerun to resume",
            outcome.checkpoint.next_offset
        );
    }

    Ok(())
}
