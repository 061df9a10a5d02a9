pub mod spool;
pub mod spool_store;

pub use spool::{ClassificationSpool, SpoolStats, DEFAULT_SPOOL_THRESHOLD};
pub use spool_store::{FileSpoolStore, MemorySpoolStore, SpoolStore};
