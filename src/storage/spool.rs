//! Threshold-bounded buffering of classified events

use std::collections::BTreeMap;

use tracing::debug;

use crate::core::{ClassifiedEvent, EntityType};
use crate::error::{Error, Result};
use crate::storage::spool_store::SpoolStore;

/// Default number of events buffered before a flush
pub const DEFAULT_SPOOL_THRESHOLD: usize = 10_000;

/// Counters describing what went through a spool
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpoolStats {
    pub events_added: u64,
    pub events_written: u64,
    pub flushes: u64,
}

/// In-memory buffer that batches classified events before writing them to a
/// caller-owned store, partitioned by entity type.
///
/// The buffer never holds more than `threshold` events, which bounds memory
/// whatever the size of the log being processed.
pub struct ClassificationSpool<'a, S: SpoolStore + ?Sized> {
    buffer: Vec<ClassifiedEvent>,
    threshold: usize,
    store: &'a mut S,
    stats: SpoolStats,
}

impl<'a, S: SpoolStore + ?Sized> ClassificationSpool<'a, S> {
    pub fn new(store: &'a mut S, threshold: usize) -> Result<Self> {
        if threshold == 0 {
            return Err(Error::Config("spool threshold must be at least 1".to_string()));
        }
        let buffer = Vec::with_capacity(threshold.min(DEFAULT_SPOOL_THRESHOLD));
        Ok(Self { buffer, threshold, store, stats: SpoolStats::default() })
    }

    pub fn add(&mut self, event: ClassifiedEvent) -> Result<()> {
        self.buffer.push(event);
        self.stats.events_added += 1;

        if self.buffer.len() >= self.threshold {
            self.flush()?;
        }
        Ok(())
    }

    /// Write the buffered events to the store and clear the buffer.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let mut partitions: BTreeMap<EntityType, Vec<ClassifiedEvent>> = BTreeMap::new();
        for event in self.buffer.drain(..) {
            partitions.entry(event.entity_type).or_default().push(event);
        }

        let mut written = 0u64;
        for (entity_type, events) in &partitions {
            self.store.append(*entity_type, events)?;
            written += events.len() as u64;
        }

        self.stats.events_written += written;
        self.stats.flushes += 1;
        debug!(events = written, flush = self.stats.flushes, "spool flushed");
        Ok(())
    }

    /// Flush whatever remains and return the counters.
    pub fn finish(mut self) -> Result<SpoolStats> {
        self.flush()?;
        Ok(self.stats)
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    pub fn stats(&self) -> &SpoolStats {
        &self.stats
    }
}
