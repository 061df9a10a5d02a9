//! Error types and result definitions

use crate::parsing::ClassifyError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the metrics pipeline
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// One of the catalog snapshot files is absent
    #[error("Missing catalog input: {}", .0.display())]
    MissingCatalog(PathBuf),

    /// A catalog snapshot file could not be read
    #[error("Catalog error in {}: {source}", .path.display())]
    Catalog {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// A log line is not valid UTF-8
    #[error("Line {line} is not valid UTF-8: {source}")]
    Decode {
        line: u64,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A log line carries a malformed timestamp
    #[error("Line {line} could not be classified: {source}")]
    Classify {
        line: u64,
        #[source]
        source: ClassifyError,
    },

    /// The line classifier could not be built from the configuration
    #[error("Invalid classifier configuration: {0}")]
    Classifier(#[from] ClassifyError),

    /// A catalog snapshot file lacks a column needed for resolution
    #[error("Catalog file {} has no `{column}` column", .path.display())]
    MissingColumn { path: PathBuf, column: String },

    /// Too many undecodable lines under the tolerant policy
    #[error("{failed} of {total} lines could not be decoded (tolerated ratio {max_ratio})")]
    DecodeThreshold { failed: u64, total: u64, max_ratio: f64 },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Whether the error comes from the content of a log line rather than the environment.
    pub fn is_line_error(&self) -> bool {
        matches!(self, Error::Decode { .. } | Error::Classify { .. })
    }
}
