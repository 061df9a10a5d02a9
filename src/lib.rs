//! # Catalog Metrics
//!
//! Catalog Metrics turns the access logs of a data-catalog front end into daily
//! visit counts per dataset, reuse, organization and resource.
//!
//! Each log line is classified against the catalog URL patterns, the matched
//! slugs are resolved against a catalog snapshot, and the hits are counted per
//! day and entity. The counts are written as header-less CSV files, one per
//! table and source log, ready for a bulk loader.
//!
//! ## Features
//!
//! - Pattern precedence and "last match wins" classification of log lines
//! - Slug and id resolution against datasets, organizations, reuses and resources
//! - Bounded memory on multi-gigabyte logs through a spooled intermediate store
//! - Per-file outputs so every source log can be loaded independently
//!
//! ## Example
//!
//! ```rust,no_run
//! use catalog_metrics::{Pipeline, PipelineConfig, Result};
//! use std::path::PathBuf;
//! use std::sync::atomic::AtomicBool;
//!
//! fn example() -> Result<()> {
//!     let pipeline = Pipeline::from_config(PipelineConfig::default())?;
//!     let report = pipeline.run(&[PathBuf::from("haproxy.log.gz")], &AtomicBool::new(false))?;
//!     println!("{} artifacts written", report.artifacts().len());
//!     Ok(())
//! }
//! ```

#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::unnecessary_map_or)]

/// Core data structures and types
pub mod core;

/// Configuration structures and utilities
pub mod config;

/// Error types and result definitions
pub mod error;

/// Access-log line classification
pub mod parsing;

/// Catalog snapshot indices
pub mod indexing;

/// Spooled intermediate storage of classified events
pub mod storage;

/// Resolution, aggregation and output
pub mod execution;

/// Per-file orchestration of all stages
pub mod pipeline;

// Re-export commonly used types
pub use config::{DecodePolicy, PipelineConfig};
pub use crate::core::{AggregatedMetric, ClassifiedEvent, EntityType, MetricTable, ResolvedEvent};
pub use error::{Error, Result};
pub use indexing::{Catalog, CatalogIndex};
pub use parsing::LineClassifier;
pub use pipeline::{FileContext, FileReport, Pipeline, RunReport};
