//! Catalog Metrics CLI - aggregate daily visit counts from catalog access logs.
//!
//! Usage:
//!   catalog-metrics --catalog-dir data/catalog --output-dir data/outputs logs/haproxy-1.log.gz
//!   catalog-metrics --config metrics.json --enable-resources logs/*.gz
//!   catalog-metrics --tolerant 0.001 logs/haproxy-2.log.gz

use catalog_metrics::{DecodePolicy, Pipeline, PipelineConfig};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "catalog-metrics")]
#[command(about = "Aggregate daily visit counts per catalog entity from access logs")]
struct Args {
    /// Log files to process, in order (gzip when ending in .gz)
    #[arg(required = true)]
    logs: Vec<PathBuf>,

    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory holding the catalog_*.csv snapshot files
    #[arg(long)]
    catalog_dir: Option<PathBuf>,

    /// Scratch directory for intermediate spool files
    #[arg(long)]
    work_dir: Option<PathBuf>,

    /// Directory receiving the output artifacts
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Number of classified events buffered before flushing to disk
    #[arg(long)]
    spool_threshold: Option<usize>,

    /// Also aggregate resource hits
    #[arg(long)]
    enable_resources: bool,

    /// Skip undecodable lines while their share stays below this ratio
    #[arg(long, value_name = "RATIO")]
    tolerant: Option<f64>,
}

impl Args {
    fn into_config(self) -> Result<(PipelineConfig, Vec<PathBuf>), Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)?,
            None => PipelineConfig::default(),
        };

        if let Some(dir) = self.catalog_dir {
            config.catalog_dir = dir;
        }
        if let Some(dir) = self.work_dir {
            config.work_dir = dir;
        }
        if let Some(dir) = self.output_dir {
            config.output_dir = dir;
        }
        if let Some(threshold) = self.spool_threshold {
            config.spool_threshold = threshold;
        }
        if self.enable_resources {
            config.enable_resources = true;
        }
        if let Some(max_failure_ratio) = self.tolerant {
            config.decode_policy = DecodePolicy::Tolerant { max_failure_ratio };
        }

        config.validate()?;
        Ok((config, self.logs))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let (config, logs) = Args::parse().into_config()?;

    info!(
        catalog = %config.catalog_dir.display(),
        output = %config.output_dir.display(),
        files = logs.len(),
        "starting catalog metrics"
    );

    let pipeline = Pipeline::from_config(config)?;

    let should_stop = Arc::new(AtomicBool::new(false));
    let should_stop_clone = Arc::clone(&should_stop);
    ctrlc::set_handler(move || {
        eprintln!("\nReceived Ctrl+C, stopping after the current file...");
        should_stop_clone.store(true, Ordering::Relaxed);
    })?;

    let report = pipeline.run(&logs, &should_stop)?;

    println!("\nCatalog Metrics Complete!");
    println!("=========================");
    for file in &report.files {
        println!(
            "#{} {}: {} lines, {} classified, {} failed, {:.2}s",
            file.context.sequence,
            file.context.source.display(),
            file.classify.lines,
            file.classify.classified,
            file.classify.failed_lines,
            file.elapsed_seconds
        );
        for table in &file.tables {
            println!(
                "    {:<14} resolved {:>9}  unresolved {:>9}  rows {:>7}",
                table.table.name(),
                table.resolve.resolved,
                table.resolve.unresolved,
                table.rows
            );
        }
        for (table, reason) in &file.failed_tables {
            println!("    {:<14} FAILED: {}", table.name(), reason);
        }
    }
    for (context, reason) in &report.failures {
        println!("#{} {}: FAILED: {}", context.sequence, context.source.display(), reason);
    }
    if let Some(manifest) = &report.manifest {
        println!("Manifest: {}", manifest.display());
    }

    if report.is_success() {
        Ok(())
    } else {
        Err("run finished with failures".into())
    }
}
