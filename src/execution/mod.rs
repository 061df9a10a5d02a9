//! Resolution, aggregation and output of classified events
//!
//! # Components
//!
//! - **Resolver** - Maps spooled raw identifiers to canonical catalog ids
//! - **Aggregator** - Counts visits per (date, id) and joins owner ids
//! - **OutputWriter** - Writes one header-less CSV per table and source file
//!
//! # Example
//!
//! ```ignore
//! let resolver = Resolver::new(&catalog);
//! let mut aggregator = Aggregator::new();
//! resolver.resolve_spooled(&store, EntityType::DatasetSlug, |e| aggregator.add(e))?;
//! let rows = aggregator.finish(&catalog.datasets);
//! writer.write(&rows, MetricTable::Datasets, 1)?;
//! ```

pub mod aggregator;
pub mod output_writer;
pub mod resolver;

pub use aggregator::{aggregate, Aggregator};
pub use output_writer::{OutputArtifact, OutputWriter, MANIFEST_FILE};
pub use resolver::{ResolveStats, Resolver};
