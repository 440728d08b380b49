//! Batch aggregation driver.
//!
//! Reads one candidate file per source, runs the resolution/dedup pipeline
//! and writes the canonical dataset plus the run report as JSON.

mod config;
mod input;

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use deodar::{
    ClusterPolicy, GeographyRegistry, Pipeline, PipelineConfig, SimilarityConfig, SourceBatch,
};

use crate::config::RunConfig;
use crate::input::load_candidates;

#[derive(Parser, Debug)]
#[command(name = "aggregate")]
#[command(about = "Aggregate scraped health-facility listings into a canonical dataset")]
struct Args {
    /// Run configuration (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Override the duplicate threshold from the config
    #[arg(long)]
    threshold: Option<f64>,

    /// Use transitive-closure clustering instead of the configured policy
    #[arg(long)]
    transitive: bool,

    /// Override the output directory from the config
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Deodar Aggregation Pipeline");

    let run_config = RunConfig::load_from_file(&args.config)?;
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| run_config.global.output_dir.clone());

    let mut similarity = SimilarityConfig::default();
    similarity.threshold = args.threshold.unwrap_or(run_config.global.threshold);

    let policy = if args.transitive {
        ClusterPolicy::TransitiveClosure
    } else {
        run_config.global.policy
    };

    let registry = Arc::new(GeographyRegistry::nepal()?);
    let pipeline = Pipeline::new(
        registry,
        PipelineConfig {
            similarity,
            policy,
            parallel: run_config.global.parallel,
        },
    )?;

    // Load every source's candidates.
    let progress = ProgressBar::new(run_config.sources.len() as u64);
    progress.set_style(
        ProgressStyle::with_template("{bar:40} {pos}/{len} {msg}")
            .context("invalid progress template")?,
    );

    let mut batches = Vec::new();
    for source in &run_config.sources {
        progress.set_message(source.name.clone());
        let records = load_candidates(&source.path, &source.name)
            .with_context(|| format!("Failed to load source {}", source.name))?;
        batches.push(SourceBatch {
            source: source.name.clone(),
            records,
        });
        progress.inc(1);
    }
    progress.finish_and_clear();

    let output = pipeline.run(batches);

    fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create output dir {}", output_dir.display()))?;

    let canonical_path = output_dir.join("canonical.json");
    let report_path = output_dir.join("report.json");

    serde_json::to_writer_pretty(
        File::create(&canonical_path).context("Failed to create canonical.json")?,
        &output.canonical,
    )?;
    serde_json::to_writer_pretty(
        File::create(&report_path).context("Failed to create report.json")?,
        &output.report,
    )?;

    info!(
        "wrote {} canonical records to {} (report: {})",
        output.canonical.len(),
        canonical_path.display(),
        report_path.display()
    );

    Ok(())
}
