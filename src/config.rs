//! Configuration structures and utilities

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What to do when a log line is not valid UTF-8 or carries a malformed timestamp.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum DecodePolicy {
    /// The first bad line aborts the file; nothing is written for it.
    Strict,
    /// Bad lines are skipped and counted; the file fails only when the share of
    /// bad lines exceeds `max_failure_ratio`.
    Tolerant { max_failure_ratio: f64 },
}

impl Default for DecodePolicy {
    fn default() -> Self {
        DecodePolicy::Strict
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory holding the four `catalog_*.csv` snapshot files
    pub catalog_dir: PathBuf,
    /// Scratch directory for the intermediate spool stores
    pub work_dir: PathBuf,
    /// Directory receiving the `<table>-<seq>.csv` artifacts and the manifest
    pub output_dir: PathBuf,
    /// Number of classified events buffered before a flush
    pub spool_threshold: usize,
    /// Token that marks a front-end access line
    pub marker: String,
    /// Locale prefixes accepted in catalog URLs
    pub languages: Vec<String>,
    /// Host prepended to `/resources/` paths to rebuild static file URLs
    pub static_host: String,
    /// Aggregate resource hits (by id and by static URL)
    pub enable_resources: bool,
    pub decode_policy: DecodePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            catalog_dir: PathBuf::from("./data/catalog"),
            work_dir: PathBuf::from("./data/work"),
            output_dir: PathBuf::from("./data/outputs"),
            spool_threshold: 10_000,
            marker: "DATAGOUVFR_RGS~".to_string(),
            languages: vec!["fr".to_string(), "en".to_string(), "es".to_string()],
            static_host: "https://static.data.gouv.fr".to_string(),
            enable_resources: false,
            decode_policy: DecodePolicy::Strict,
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; missing fields take their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.spool_threshold == 0 {
            return Err(Error::Config("spool_threshold must be at least 1".to_string()));
        }
        if self.marker.is_empty() {
            return Err(Error::Config("marker must not be empty".to_string()));
        }
        if self.languages.is_empty() {
            return Err(Error::Config("at least one language prefix is required".to_string()));
        }
        if self.languages.iter().any(|l| l.is_empty() || l.contains('/')) {
            return Err(Error::Config(format!("invalid language prefixes: {:?}", self.languages)));
        }
        if let DecodePolicy::Tolerant { max_failure_ratio } = self.decode_policy {
            if !(0.0..=1.0).contains(&max_failure_ratio) {
                return Err(Error::Config(format!(
                    "max_failure_ratio must be within [0, 1], got {}",
                    max_failure_ratio
                )));
            }
        }
        Ok(())
    }
}
