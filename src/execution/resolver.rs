//! Raw identifier resolution against the catalog snapshot

use crate::core::{decode_spool_line, ClassifiedEvent, EntityType, ResolvedEvent};
use crate::error::Result;
use crate::indexing::Catalog;
use crate::storage::SpoolStore;
use chrono::NaiveDate;
use tracing::warn;

/// Counters of a resolution pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub resolved: u64,
    pub unresolved: u64,
    /// Spool lines that could not be read back
    pub malformed: u64,
}

impl ResolveStats {
    pub fn merge(&mut self, other: ResolveStats) {
        self.resolved += other.resolved;
        self.unresolved += other.unresolved;
        self.malformed += other.malformed;
    }
}

/// Maps raw identifiers to canonical catalog ids.
///
/// Each entity type resolves against the index of its output table; both
/// resource types go through the resources index, by id or by static URL.
pub struct Resolver<'c> {
    catalog: &'c Catalog,
}

impl<'c> Resolver<'c> {
    pub fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    pub fn resolve_raw(
        &self,
        date: NaiveDate,
        entity_type: EntityType,
        raw_identifier: &str,
    ) -> Option<ResolvedEvent> {
        let index = self.catalog.index(entity_type.table());
        index.resolve(raw_identifier).map(|id| ResolvedEvent {
            date,
            entity_type,
            canonical_id: id.to_string(),
        })
    }

    pub fn resolve(&self, event: &ClassifiedEvent) -> Option<ResolvedEvent> {
        self.resolve_raw(event.date, event.entity_type, &event.raw_identifier)
    }

    /// Resolve every event spooled for `entity_type`, handing the hits to `sink`.
    ///
    /// Unknown identifiers are dropped and only counted.
    pub fn resolve_spooled<S, F>(&self, store: &S, entity_type: EntityType, mut sink: F) -> Result<ResolveStats>
    where
        S: SpoolStore + ?Sized,
        F: FnMut(ResolvedEvent),
    {
        let mut stats = ResolveStats::default();
        for line in store.lines(entity_type)? {
            let line = line?;
            let Some((date, raw_identifier)) = decode_spool_line(&line) else {
                stats.malformed += 1;
                continue;
            };
            match self.resolve_raw(date, entity_type, raw_identifier) {
                Some(resolved) => {
                    stats.resolved += 1;
                    sink(resolved);
                }
                None => stats.unresolved += 1,
            }
        }
        if stats.malformed > 0 {
            warn!(entity_type = %entity_type, malformed = stats.malformed, "unreadable spool lines skipped");
        }
        Ok(stats)
    }
}
