//! Catalog snapshot loading
//!
//! The snapshot is four `;`-separated CSV exports with a header row. Only the
//! columns used for resolution and for the owner join are read; any other
//! column is ignored.

use crate::core::MetricTable;
use crate::error::{Error, Result};
use crate::indexing::catalog_index::{non_empty, CatalogEntry, CatalogIndex, Owner};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

pub const DATASETS_FILE: &str = "catalog_datasets.csv";
pub const ORGANIZATIONS_FILE: &str = "catalog_organizations.csv";
pub const REUSES_FILE: &str = "catalog_reuses.csv";
pub const RESOURCES_FILE: &str = "catalog_resources.csv";

const DATASET_COLUMNS: &[&str] = &["id", "slug", "organization_id"];
const ORGANIZATION_COLUMNS: &[&str] = &["id", "slug"];
const REUSE_COLUMNS: &[&str] = &["id", "slug", "organization_id"];
const RESOURCE_COLUMNS: &[&str] = &["id", "url", "dataset.id", "dataset.organization_id"];

#[derive(Debug, Deserialize)]
struct DatasetRow {
    id: String,
    slug: Option<String>,
    organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganizationRow {
    id: String,
    slug: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ReuseRow {
    id: String,
    slug: Option<String>,
    organization_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResourceRow {
    id: String,
    url: Option<String>,
    #[serde(rename = "dataset.id")]
    dataset_id: Option<String>,
    #[serde(rename = "dataset.organization_id")]
    organization_id: Option<String>,
}

/// The four read-only indices used for a whole run.
#[derive(Debug, Default)]
pub struct Catalog {
    pub datasets: CatalogIndex,
    pub organizations: CatalogIndex,
    pub reuses: CatalogIndex,
    pub resources: CatalogIndex,
}

impl Catalog {
    /// Load all four snapshot files from `dir`.
    ///
    /// Every file must be present; a missing one fails before anything is read.
    /// Resources hosted on `static_host` are only reachable through their URL.
    pub fn load(dir: &Path, static_host: &str) -> Result<Self> {
        for file in [DATASETS_FILE, ORGANIZATIONS_FILE, REUSES_FILE, RESOURCES_FILE] {
            let path = dir.join(file);
            if !path.is_file() {
                return Err(Error::MissingCatalog(path));
            }
        }

        let datasets = read_rows::<DatasetRow>(&dir.join(DATASETS_FILE), DATASET_COLUMNS)?
            .into_iter()
            .map(|row| CatalogEntry {
                id: row.id,
                key: non_empty(row.slug),
                owner: Owner { dataset_id: None, organization_id: non_empty(row.organization_id) },
                self_mapped: true,
            });
        let organizations = read_rows::<OrganizationRow>(&dir.join(ORGANIZATIONS_FILE), ORGANIZATION_COLUMNS)?
            .into_iter()
            .map(|row| CatalogEntry {
                id: row.id,
                key: non_empty(row.slug),
                owner: Owner::default(),
                self_mapped: true,
            });
        let reuses = read_rows::<ReuseRow>(&dir.join(REUSES_FILE), REUSE_COLUMNS)?.into_iter().map(|row| {
            CatalogEntry {
                id: row.id,
                key: non_empty(row.slug),
                owner: Owner { dataset_id: None, organization_id: non_empty(row.organization_id) },
                self_mapped: true,
            }
        });

        let host = host_of(static_host);
        let resources = read_rows::<ResourceRow>(&dir.join(RESOURCES_FILE), RESOURCE_COLUMNS)?
            .into_iter()
            .map(|row| {
                let url = non_empty(row.url);
                let is_static = url.as_deref().map_or(false, |u| !host.is_empty() && u.contains(host));
                CatalogEntry {
                    id: row.id,
                    key: url,
                    owner: Owner {
                        dataset_id: non_empty(row.dataset_id),
                        organization_id: non_empty(row.organization_id),
                    },
                    self_mapped: !is_static,
                }
            });

        let catalog = Self {
            datasets: CatalogIndex::build(datasets),
            organizations: CatalogIndex::build(organizations),
            reuses: CatalogIndex::build(reuses),
            resources: CatalogIndex::build(resources),
        };

        info!(
            datasets = catalog.datasets.entity_count(),
            organizations = catalog.organizations.entity_count(),
            reuses = catalog.reuses.entity_count(),
            resources = catalog.resources.entity_count(),
            "catalog snapshot loaded from {}",
            dir.display()
        );

        Ok(catalog)
    }

    pub fn index(&self, table: MetricTable) -> &CatalogIndex {
        match table {
            MetricTable::Datasets => &self.datasets,
            MetricTable::Organizations => &self.organizations,
            MetricTable::Reuses => &self.reuses,
            MetricTable::Resources => &self.resources,
        }
    }
}

/// Read every row of a snapshot file.
///
/// Each of `required` must be a header; cells may still be empty.
fn read_rows<T: DeserializeOwned>(path: &Path, required: &[&str]) -> Result<Vec<T>> {
    let to_error = |source: csv::Error| Error::Catalog { path: PathBuf::from(path), source };

    let mut reader =
        csv::ReaderBuilder::new().delimiter(b';').flexible(true).from_path(path).map_err(to_error)?;

    let headers = reader.headers().map_err(to_error)?;
    if let Some(column) = required.iter().find(|c| !headers.iter().any(|h| h == **c)) {
        return Err(Error::MissingColumn { path: path.to_path_buf(), column: (*column).to_string() });
    }

    reader.deserialize::<T>().collect::<std::result::Result<Vec<T>, _>>().map_err(to_error)
}

fn host_of(url: &str) -> &str {
    let without_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    without_scheme.trim_end_matches('/')
}
