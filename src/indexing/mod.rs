//! Catalog snapshot indices used to resolve slugs to canonical ids

pub mod catalog;
pub mod catalog_index;

pub use catalog::Catalog;
pub use catalog_index::{CatalogEntry, CatalogIndex, Owner};
