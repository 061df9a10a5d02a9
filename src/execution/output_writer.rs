//! CSV artifacts and the load manifest

use crate::core::{AggregatedMetric, MetricTable, DATE_FORMAT};
use crate::error::Result;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Name of the load description written next to the artifacts
pub const MANIFEST_FILE: &str = "manifest.json";

/// One written output file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputArtifact {
    pub table: MetricTable,
    pub path: PathBuf,
    pub file_sequence: u32,
    pub rows: usize,
}

#[derive(Debug, Serialize)]
struct ManifestEntry<'a> {
    table: String,
    columns: &'static [&'static str],
    path: &'a Path,
    file_sequence: u32,
    rows: usize,
}

#[derive(Debug, Serialize)]
struct LoadManifest<'a> {
    artifacts: Vec<ManifestEntry<'a>>,
}

/// Writes header-less CSV artifacts, one per (table, source file).
#[derive(Debug, Clone)]
pub struct OutputWriter {
    dir: PathBuf,
}

impl OutputWriter {
    pub fn new(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self { dir: dir.to_path_buf() })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, table: MetricTable, file_sequence: u32) -> PathBuf {
        self.dir.join(format!("{}-{}.csv", table.name(), file_sequence))
    }

    /// Write the rows of one table for one source file.
    ///
    /// Nothing is written when there are no rows; a stale artifact with the
    /// same name is removed so the loader cannot pick it up.
    pub fn write(
        &self,
        metrics: &[AggregatedMetric],
        table: MetricTable,
        file_sequence: u32,
    ) -> Result<Option<OutputArtifact>> {
        let path = self.path_for(table, file_sequence);
        if metrics.is_empty() {
            if path.exists() {
                std::fs::remove_file(&path)?;
            }
            debug!(table = %table, file_sequence, "no rows, artifact skipped");
            return Ok(None);
        }

        let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(&path)?;
        for metric in metrics {
            writer.write_record(record(metric, table))?;
        }
        writer.flush()?;

        info!(table = %table, file_sequence, rows = metrics.len(), "wrote {}", path.display());
        Ok(Some(OutputArtifact { table, path, file_sequence, rows: metrics.len() }))
    }

    /// Remove every artifact previously written for a source file.
    ///
    /// Returns the number of files removed.
    pub fn discard(&self, file_sequence: u32) -> Result<usize> {
        let mut removed = 0;
        for table in MetricTable::ALL {
            let path = self.path_for(table, file_sequence);
            if path.exists() {
                std::fs::remove_file(&path)?;
                removed += 1;
            }
        }
        if removed > 0 {
            debug!(file_sequence, removed, "discarded stale artifacts");
        }
        Ok(removed)
    }

    /// Describe the artifacts for the external loader: target table and column order.
    pub fn write_manifest(&self, artifacts: &[OutputArtifact]) -> Result<PathBuf> {
        let manifest = LoadManifest {
            artifacts: artifacts
                .iter()
                .map(|a| ManifestEntry {
                    table: a.table.sql_table(),
                    columns: a.table.columns(),
                    path: &a.path,
                    file_sequence: a.file_sequence,
                    rows: a.rows,
                })
                .collect(),
        };

        let path = self.dir.join(MANIFEST_FILE);
        serde_json::to_writer_pretty(File::create(&path)?, &manifest)?;
        Ok(path)
    }
}

fn record(metric: &AggregatedMetric, table: MetricTable) -> Vec<String> {
    let date = metric.date.format(DATE_FORMAT).to_string();
    let organization = metric.organization_id.clone().unwrap_or_default();
    let visits = metric.visit_count.to_string();

    match table {
        MetricTable::Datasets | MetricTable::Reuses => {
            vec![date, metric.entity_id.clone(), organization, visits]
        }
        MetricTable::Organizations => vec![date, metric.entity_id.clone(), visits],
        MetricTable::Resources => vec![
            date,
            metric.entity_id.clone(),
            metric.dataset_id.clone().unwrap_or_default(),
            organization,
            visits,
        ],
    }
}
