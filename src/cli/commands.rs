//! CLI commands implementation.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use console::style;
use indicatif::ProgressBar;

use crate::config::{load_settings, Settings};
use crate::driver::{ChromiumDriver, RenderDriver};
use crate::harvest::Harvester;
use crate::models::{Availability, Record};

#[derive(Parser)]
#[command(name = "harvest")]
#[command(about = "Incremental infinite-scroll product harvester")]
#[command(version)]
pub struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest the configured collection page, resuming from any checkpoint
    Harvest {
        /// Override the collection URL
        #[arg(long)]
        url: Option<String>,
        /// Run the browser with a visible window
        #[arg(long)]
        headful: bool,
    },

    /// Summarize a harvested artifact
    Inspect {
        /// Artifact to inspect (defaults to the final output, falling back
        /// to the checkpoint)
        path: Option<PathBuf>,
    },

    /// Emit records as bulk-indexing NDJSON keyed by sequence number
    Export {
        /// Artifact to export (same default as inspect)
        path: Option<PathBuf>,
        /// Index name for the action lines
        #[arg(long, default_value = "products")]
        index: String,
    },
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();
    let mut settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Commands::Harvest { url, headful } => {
            if let Some(url) = url {
                settings.source.url = url;
            }
            if headful {
                settings.driver.headless = false;
            }
            cmd_harvest(settings).await
        }
        Commands::Inspect { path } => cmd_inspect(&settings, path.as_deref()),
        Commands::Export { path, index } => cmd_export(&settings, path.as_deref(), &index),
    }
}

async fn cmd_harvest(settings: Settings) -> Result<()> {
    let cancel = Arc::new(AtomicBool::new(false));
    let cancel_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!(
                "{}",
                style("Interrupted, saving progress before exit...").yellow()
            );
            cancel_flag.store(true, Ordering::Relaxed);
        }
    });

    // Driver construction failure is fatal configuration: report and exit
    // before any artifact is touched.
    let mut driver = ChromiumDriver::launch(&settings.driver)
        .await
        .context("constructing the render driver")?;

    let spinner = ProgressBar::new_spinner();
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner.set_message("Loading collection page...");

    let mut harvester = Harvester::new(settings, cancel).with_progress(spinner.clone());
    let result = harvester.run(&mut driver).await;
    driver.close().await;
    spinner.finish_and_clear();

    let report = result?;
    if report.completed {
        println!(
            "{} {} records ({} new this run)",
            style("Harvest complete:").green().bold(),
            report.total,
            report.new_this_run
        );
    } else {
        println!(
            "{} {} records kept in the checkpoint for resume",
            style("Harvest interrupted:").yellow().bold(),
            report.total
        );
    }
    Ok(())
}

/// Pick the artifact to read: explicit path, else final output, else the
/// in-progress checkpoint.
fn resolve_artifact(settings: &Settings, path: Option<&Path>) -> PathBuf {
    match path {
        Some(p) => p.to_path_buf(),
        None => {
            let output = Path::new(&settings.checkpoint.output);
            if output.exists() {
                output.to_path_buf()
            } else {
                PathBuf::from(&settings.checkpoint.path)
            }
        }
    }
}

fn read_artifact(path: &Path) -> Result<Vec<Record>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading artifact {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing artifact {}", path.display()))
}

fn cmd_inspect(settings: &Settings, path: Option<&Path>) -> Result<()> {
    let path = resolve_artifact(settings, path);
    let records = read_artifact(&path)?;

    let in_stock = records
        .iter()
        .filter(|r| r.availability == Availability::InStock)
        .count();
    let sold_out = records
        .iter()
        .filter(|r| r.availability == Availability::SoldOut)
        .count();
    let priced = records.iter().filter(|r| r.price.is_some()).count();
    let with_image = records.iter().filter(|r| r.image_url.is_some()).count();

    println!("{} {}", style("Artifact:").bold(), path.display());
    println!("  records:      {}", records.len());
    println!(
        "  availability: {} in stock, {} sold out, {} unknown",
        in_stock,
        sold_out,
        records.len() - in_stock - sold_out
    );
    println!("  with price:   {}", priced);
    println!("  with image:   {}", with_image);
    Ok(())
}

/// Emit the bulk-load shape the downstream index expects: an action line
/// keyed by sequence number, then the record document, one pair per record.
fn cmd_export(settings: &Settings, path: Option<&Path>, index: &str) -> Result<()> {
    let path = resolve_artifact(settings, path);
    let records = read_artifact(&path)?;

    let mut out = String::new();
    for (seq, record) in records.iter().enumerate() {
        let action = serde_json::json!({ "index": { "_index": index, "_id": seq } });
        out.push_str(&action.to_string());
        out.push('\n');
        out.push_str(&serde_json::to_string(record).context("serializing record")?);
        out.push('\n');
    }
    print!("{}", out);
    Ok(())
}
