//! Per-file metrics pipeline
//!
//! One log file goes through classification, spooling, resolution,
//! aggregation and output before the next one starts. Each file runs under its
//! own [`FileContext`]: a sequence number used to name its artifacts and a
//! private spool directory, so nothing from a previous file leaks into its
//! counts.

pub mod log_reader;

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{error, info, warn};

use crate::config::{DecodePolicy, PipelineConfig};
use crate::core::MetricTable;
use crate::error::{Error, Result};
use crate::execution::{Aggregator, OutputArtifact, OutputWriter, ResolveStats, Resolver};
use crate::indexing::Catalog;
use crate::parsing::LineClassifier;
use crate::storage::{ClassificationSpool, FileSpoolStore, SpoolStats, SpoolStore};

pub use log_reader::LogReader;

/// Number of bad lines kept verbatim in a report
const FAILURE_SAMPLES: usize = 5;

/// Identity of one source file within a run.
#[derive(Debug, Clone)]
pub struct FileContext {
    pub sequence: u32,
    pub source: PathBuf,
}

impl FileContext {
    pub fn new(sequence: u32, source: &Path) -> Self {
        Self { sequence, source: source.to_path_buf() }
    }

    /// Spool directory private to this file.
    pub fn spool_dir(&self, work_dir: &Path) -> PathBuf {
        work_dir.join("found").join(self.sequence.to_string())
    }
}

/// Outcome of classifying every line of a file.
#[derive(Debug, Clone, Default)]
pub struct ClassifyReport {
    pub lines: u64,
    pub classified: u64,
    pub failed_lines: u64,
    pub failure_samples: Vec<String>,
    pub spool: SpoolStats,
}

#[derive(Debug, Clone)]
pub struct TableReport {
    pub table: MetricTable,
    pub resolve: ResolveStats,
    pub rows: usize,
    pub artifact: Option<OutputArtifact>,
}

#[derive(Debug, Clone)]
pub struct FileReport {
    pub context: FileContext,
    pub classify: ClassifyReport,
    pub tables: Vec<TableReport>,
    /// Tables whose aggregation failed; the others were still written
    pub failed_tables: Vec<(MetricTable, String)>,
    pub elapsed_seconds: f64,
}

impl FileReport {
    pub fn artifacts(&self) -> impl Iterator<Item = &OutputArtifact> {
        self.tables.iter().filter_map(|t| t.artifact.as_ref())
    }
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,
    pub failures: Vec<(FileContext, String)>,
    /// Set when the run was interrupted before all files were processed
    pub stopped: bool,
    pub manifest: Option<PathBuf>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty() && !self.stopped && self.files.iter().all(|f| f.failed_tables.is_empty())
    }

    pub fn artifacts(&self) -> Vec<OutputArtifact> {
        self.files.iter().flat_map(|f| f.artifacts().cloned()).collect()
    }
}

/// Runs log files through the metrics pipeline against one catalog snapshot.
pub struct Pipeline {
    config: PipelineConfig,
    catalog: Catalog,
    classifier: LineClassifier,
    writer: OutputWriter,
}

impl Pipeline {
    pub fn new(config: PipelineConfig, catalog: Catalog) -> Result<Self> {
        config.validate()?;
        let classifier = LineClassifier::from_config(&config)?;
        let writer = OutputWriter::new(&config.output_dir)?;
        Ok(Self { config, catalog, classifier, writer })
    }

    /// Load the catalog snapshot named by the configuration and build a pipeline.
    pub fn from_config(config: PipelineConfig) -> Result<Self> {
        let catalog = Catalog::load(&config.catalog_dir, &config.static_host)?;
        Self::new(config, catalog)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn writer(&self) -> &OutputWriter {
        &self.writer
    }

    /// Tables aggregated by this pipeline.
    pub fn tables(&self) -> Vec<MetricTable> {
        MetricTable::ALL
            .into_iter()
            .filter(|t| *t != MetricTable::Resources || self.config.enable_resources)
            .collect()
    }

    /// Process files in order, numbering them from 1.
    ///
    /// A failing file is recorded, any artifact left under its sequence number
    /// by an earlier run is removed, and the run moves on. `stop` is checked
    /// between files only.
    pub fn run(&self, paths: &[PathBuf], stop: &AtomicBool) -> Result<RunReport> {
        let mut report = RunReport::default();

        for (i, path) in paths.iter().enumerate() {
            if stop.load(Ordering::Relaxed) {
                warn!(remaining = paths.len() - i, "run interrupted, remaining files left untouched");
                report.stopped = true;
                break;
            }

            let context = FileContext::new(i as u32 + 1, path);
            match self.process_file(&context) {
                Ok(file_report) => report.files.push(file_report),
                Err(e) => {
                    error!(file = %path.display(), sequence = context.sequence, "file failed: {}", e);
                    if let Err(cleanup) = self.writer.discard(context.sequence) {
                        warn!(sequence = context.sequence, "could not remove stale artifacts: {}", cleanup);
                    }
                    report.failures.push((context, e.to_string()));
                }
            }
        }

        let artifacts = report.artifacts();
        report.manifest = Some(self.writer.write_manifest(&artifacts)?);
        Ok(report)
    }

    /// Process one log file using a spool directory under the work dir.
    pub fn process_file(&self, context: &FileContext) -> Result<FileReport> {
        let mut store = FileSpoolStore::create(&context.spool_dir(&self.config.work_dir))?;
        let result = LogReader::open(&context.source)
            .and_then(|mut reader| self.process_with_store(&mut reader, context, &mut store));
        if let Err(e) = store.remove() {
            warn!(sequence = context.sequence, "could not remove spool directory: {}", e);
        }
        result
    }

    /// Process one log through a caller-owned spool store.
    ///
    /// The store is reset first. No artifact is written when classification fails.
    pub fn process_with_store<R, S>(
        &self,
        reader: &mut LogReader<R>,
        context: &FileContext,
        store: &mut S,
    ) -> Result<FileReport>
    where
        R: BufRead,
        S: SpoolStore + ?Sized,
    {
        let started = Instant::now();
        info!(file = %context.source.display(), sequence = context.sequence, "processing log");

        store.reset()?;
        let classify = self.classify_into(reader, &mut *store)?;
        info!(
            lines = classify.lines,
            classified = classify.classified,
            failed = classify.failed_lines,
            "log classified"
        );

        let mut tables = Vec::new();
        let mut failed_tables = Vec::new();
        for table in self.tables() {
            match self.aggregate_table(&*store, table, context.sequence) {
                Ok(table_report) => tables.push(table_report),
                Err(e) => {
                    warn!(table = %table, "aggregation failed: {}", e);
                    failed_tables.push((table, e.to_string()));
                }
            }
        }

        let elapsed_seconds = started.elapsed().as_secs_f64();
        info!(sequence = context.sequence, elapsed_seconds, "log processed");
        Ok(FileReport { context: context.clone(), classify, tables, failed_tables, elapsed_seconds })
    }

    fn classify_into<R, S>(&self, reader: &mut LogReader<R>, store: &mut S) -> Result<ClassifyReport>
    where
        R: BufRead,
        S: SpoolStore + ?Sized,
    {
        let mut report = ClassifyReport::default();
        let mut spool = ClassificationSpool::new(store, self.config.spool_threshold)?;

        while let Some((line_number, bytes)) = reader.read_line()? {
            report.lines += 1;

            let outcome = std::str::from_utf8(bytes)
                .map_err(|source| Error::Decode { line: line_number, source })
                .and_then(|line| {
                    self.classifier
                        .classify(line)
                        .map_err(|source| Error::Classify { line: line_number, source })
                });

            match outcome {
                Ok(Some(event)) => {
                    report.classified += 1;
                    spool.add(event)?;
                }
                Ok(None) => {}
                Err(e) => match self.config.decode_policy {
                    DecodePolicy::Strict => return Err(e),
                    DecodePolicy::Tolerant { .. } => {
                        report.failed_lines += 1;
                        if report.failure_samples.len() < FAILURE_SAMPLES {
                            warn!("skipping line: {}", e);
                            report.failure_samples.push(e.to_string());
                        }
                    }
                },
            }
        }

        report.spool = spool.finish()?;

        if let DecodePolicy::Tolerant { max_failure_ratio } = self.config.decode_policy {
            let ratio = if report.lines == 0 { 0.0 } else { report.failed_lines as f64 / report.lines as f64 };
            if ratio > max_failure_ratio {
                return Err(Error::DecodeThreshold {
                    failed: report.failed_lines,
                    total: report.lines,
                    max_ratio: max_failure_ratio,
                });
            }
        }

        Ok(report)
    }

    fn aggregate_table<S>(&self, store: &S, table: MetricTable, sequence: u32) -> Result<TableReport>
    where
        S: SpoolStore + ?Sized,
    {
        let resolver = Resolver::new(&self.catalog);
        let mut aggregator = Aggregator::new();
        let mut resolve = ResolveStats::default();

        for entity_type in table.entity_types() {
            let stats = resolver.resolve_spooled(store, *entity_type, |event| aggregator.add(event))?;
            resolve.merge(stats);
        }

        if aggregator.is_empty() {
            info!(table = %table, "empty data {}", table);
        }

        let rows = aggregator.finish(self.catalog.index(table));
        let artifact = self.writer.write(&rows, table, sequence)?;
        Ok(TableReport { table, resolve, rows: rows.len(), artifact })
    }
}
