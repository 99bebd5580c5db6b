//! IBOV CLI: daily ingest, partition probe and trigger dry run.
//!
//! Commands:
//! - `run`: download today's IBOV composition, transform it and upload it as Parquet
//! - `exists`: check whether a day's partition already holds an object
//! - `trigger`: feed a bucket notification event to the downstream trigger (dry run)

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use ibov_core::B3Fetcher;
use ibov_runner::{
    handle_event, local_today, LoggingLauncher, MemoryStorage, Pipeline, PipelineConfig, Uploader,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(
    name = "ibov",
    about = "IBOV daily portfolio ingest, B3 download to partitioned Parquet"
)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// TOML config file. Defaults and environment credentials apply without it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Download, validate, transform and upload today's composition.
    Run {
        /// Keep the Parquet in memory instead of uploading it.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },
    /// Check whether the partition for a date already exists.
    Exists {
        /// Date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        date: Option<String>,
    },
    /// Run the downstream trigger on a notification event without starting a job.
    Trigger {
        /// Path to the event JSON.
        #[arg(long)]
        event: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Run { dry_run } => run_ingest(cli.config.as_deref(), dry_run),
        Commands::Exists { date } => run_exists(cli.config.as_deref(), date.as_deref()),
        Commands::Trigger { event } => run_trigger(&event),
    };

    if let Err(e) = &result {
        error!("{e:#}");
    }
    result
}

fn run_ingest(config_path: Option<&Path>, dry_run: bool) -> Result<()> {
    let config = PipelineConfig::load(config_path)?;
    info!(?config, "configuration loaded");

    let fetcher = B3Fetcher::new(config.fetch.clone())?;
    let uploader = if dry_run {
        info!("dry run: objects stay in memory");
        Uploader::new(Arc::new(MemoryStorage::new()), &config.storage)
    } else {
        Uploader::s3(&config.storage)?
    };

    let report = Pipeline::new(Box::new(fetcher), uploader).run()?;
    if let Some(e) = &report.temp_cleanup_error {
        eprintln!("warning: staged parquet not removed: {e}");
    }
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn run_exists(config_path: Option<&Path>, date: Option<&str>) -> Result<()> {
    let date = date
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("--date must be YYYY-MM-DD")?
        .unwrap_or_else(local_today);

    let config = PipelineConfig::load(config_path)?;
    let uploader = Uploader::s3(&config.storage)?;
    let exists = uploader.exists(date)?;

    println!("{} {}", uploader.locator(date), if exists { "exists" } else { "missing" });
    Ok(())
}

fn run_trigger(event_path: &Path) -> Result<()> {
    let raw = std::fs::read_to_string(event_path)
        .with_context(|| format!("reading {}", event_path.display()))?;
    let event: serde_json::Value = serde_json::from_str(&raw)
        .with_context(|| format!("parsing {}", event_path.display()))?;

    let response = handle_event(&event, &LoggingLauncher);
    println!("{}", serde_json::to_string_pretty(&response)?);

    if !response.is_success() {
        bail!("trigger returned status {}", response.status_code);
    }
    Ok(())
}
