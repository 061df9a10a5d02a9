//! Core data structures shared by every stage of the metrics pipeline

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of catalog entity a log line points at.
///
/// The classifier produces these; resolution and aggregation match on them
/// exhaustively, so adding a variant is a compile-time checked change.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EntityType {
    DatasetSlug,
    ReuseSlug,
    OrganizationSlug,
    ResourceById,
    ResourceStaticUrl,
}

impl EntityType {
    pub const ALL: [EntityType; 5] = [
        EntityType::ResourceById,
        EntityType::ResourceStaticUrl,
        EntityType::DatasetSlug,
        EntityType::OrganizationSlug,
        EntityType::ReuseSlug,
    ];

    /// Tag used to name the intermediate spool store of this type.
    pub fn spool_tag(self) -> &'static str {
        match self {
            EntityType::DatasetSlug => "datasets",
            EntityType::ReuseSlug => "reuses",
            EntityType::OrganizationSlug => "organizations",
            EntityType::ResourceById => "resources-id",
            EntityType::ResourceStaticUrl => "resources-static",
        }
    }

    /// Output table the events of this type are counted into.
    pub fn table(self) -> MetricTable {
        match self {
            EntityType::DatasetSlug => MetricTable::Datasets,
            EntityType::ReuseSlug => MetricTable::Reuses,
            EntityType::OrganizationSlug => MetricTable::Organizations,
            EntityType::ResourceById | EntityType::ResourceStaticUrl => MetricTable::Resources,
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.spool_tag())
    }
}

/// Output grouping handed to the external loader, one `metrics_<name>` table each.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricTable {
    Datasets,
    Organizations,
    Reuses,
    Resources,
}

impl MetricTable {
    pub const ALL: [MetricTable; 4] = [
        MetricTable::Datasets,
        MetricTable::Organizations,
        MetricTable::Reuses,
        MetricTable::Resources,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MetricTable::Datasets => "datasets",
            MetricTable::Organizations => "organizations",
            MetricTable::Reuses => "reuses",
            MetricTable::Resources => "resources",
        }
    }

    /// Name of the relational table the loader copies this output into.
    pub fn sql_table(self) -> String {
        format!("metrics_{}", self.name())
    }

    /// Column order of the header-less output artifact.
    pub fn columns(self) -> &'static [&'static str] {
        match self {
            MetricTable::Datasets => &["date_metric", "dataset_id", "organization_id", "nb_visit"],
            MetricTable::Organizations => &["date_metric", "organization_id", "nb_visit"],
            MetricTable::Reuses => &["date_metric", "reuse_id", "organization_id", "nb_visit"],
            MetricTable::Resources => {
                &["date_metric", "resource_id", "dataset_id", "organization_id", "nb_visit"]
            }
        }
    }

    /// Entity types whose events feed this table.
    pub fn entity_types(self) -> &'static [EntityType] {
        match self {
            MetricTable::Datasets => &[EntityType::DatasetSlug],
            MetricTable::Organizations => &[EntityType::OrganizationSlug],
            MetricTable::Reuses => &[EntityType::ReuseSlug],
            MetricTable::Resources => &[EntityType::ResourceById, EntityType::ResourceStaticUrl],
        }
    }
}

impl fmt::Display for MetricTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One matched log line: the day it happened and the raw identifier found in the URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClassifiedEvent {
    pub date: NaiveDate,
    pub entity_type: EntityType,
    pub raw_identifier: String,
}

impl ClassifiedEvent {
    pub fn new(date: NaiveDate, entity_type: EntityType, raw_identifier: &str) -> Self {
        Self { date, entity_type, raw_identifier: raw_identifier.to_string() }
    }
}

/// A classified event whose identifier was found in the catalog.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedEvent {
    pub date: NaiveDate,
    pub entity_type: EntityType,
    pub canonical_id: String,
}

/// One output row: visits of an entity on a given day within one source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AggregatedMetric {
    pub date: NaiveDate,
    pub entity_id: String,
    /// Owning dataset, only set for resources.
    pub dataset_id: Option<String>,
    pub organization_id: Option<String>,
    pub visit_count: u64,
}

pub mod encoding;
pub use encoding::*;
