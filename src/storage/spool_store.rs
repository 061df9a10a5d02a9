//! Intermediate stores for spooled events

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::core::{encode_spool_line, ClassifiedEvent, EntityType};
use crate::error::{Error, Result};

/// Append-only intermediate store, one partition per entity type.
///
/// Stores are owned by the caller and handed to the spool and the resolver,
/// so two files of the same run never share a partition.
pub trait SpoolStore {
    /// Append a batch of events of one entity type.
    fn append(&mut self, entity_type: EntityType, events: &[ClassifiedEvent]) -> Result<()>;

    /// Stream back the `date;raw_identifier` lines written for an entity type.
    ///
    /// A type that never received events yields no lines.
    fn lines(&self, entity_type: EntityType) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>>;

    /// Drop everything written so far.
    fn reset(&mut self) -> Result<()>;
}

/// Store keeping one `found_<tag>.csv` file per entity type under a directory.
#[derive(Debug)]
pub struct FileSpoolStore {
    dir: PathBuf,
}

impl FileSpoolStore {
    /// Open a store rooted at `dir`, clearing whatever a previous file left there.
    pub fn create(dir: &Path) -> Result<Self> {
        let mut store = Self { dir: dir.to_path_buf() };
        store.reset()?;
        Ok(store)
    }

    pub fn path(&self, entity_type: EntityType) -> PathBuf {
        self.dir.join(format!("found_{}.csv", entity_type.spool_tag()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Remove the store directory and everything in it.
    pub fn remove(self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        Ok(())
    }
}

impl SpoolStore for FileSpoolStore {
    fn append(&mut self, entity_type: EntityType, events: &[ClassifiedEvent]) -> Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(self.path(entity_type))?;
        let mut writer = BufWriter::new(file);
        for event in events {
            writeln!(writer, "{}", encode_spool_line(event.date, &event.raw_identifier))?;
        }
        writer.flush()?;
        Ok(())
    }

    fn lines(&self, entity_type: EntityType) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>> {
        let path = self.path(entity_type);
        if !path.exists() {
            return Ok(Box::new(std::iter::empty()));
        }
        let reader = BufReader::new(File::open(path)?);
        Ok(Box::new(reader.lines().map(|line| line.map_err(Error::from))))
    }

    fn reset(&mut self) -> Result<()> {
        if self.dir.exists() {
            std::fs::remove_dir_all(&self.dir)?;
        }
        std::fs::create_dir_all(&self.dir)?;
        Ok(())
    }
}

/// Store keeping the encoded lines in memory.
#[derive(Debug, Default)]
pub struct MemorySpoolStore {
    partitions: HashMap<EntityType, Vec<String>>,
}

impl MemorySpoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self, entity_type: EntityType) -> usize {
        self.partitions.get(&entity_type).map_or(0, Vec::len)
    }

    pub fn total_len(&self) -> usize {
        self.partitions.values().map(Vec::len).sum()
    }
}

impl SpoolStore for MemorySpoolStore {
    fn append(&mut self, entity_type: EntityType, events: &[ClassifiedEvent]) -> Result<()> {
        let partition = self.partitions.entry(entity_type).or_default();
        partition.extend(events.iter().map(|e| encode_spool_line(e.date, &e.raw_identifier)));
        Ok(())
    }

    fn lines(&self, entity_type: EntityType) -> Result<Box<dyn Iterator<Item = Result<String>> + '_>> {
        let lines = self
            .partitions
            .get(&entity_type)
            .into_iter()
            .flatten()
            .map(|line| -> Result<String> { Ok(line.clone()) });
        Ok(Box::new(lines))
    }

    fn reset(&mut self) -> Result<()> {
        self.partitions.clear();
        Ok(())
    }
}
