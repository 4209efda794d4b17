//! In-memory log store
//!
//! An index-based arena: entries live in a `Vec` where index `i` holds
//! version `i + 1`, and the write lock around it is the table's single
//! serialization point.

use parking_lot::RwLock;

use crate::error::{LakeTxError, Result};

use super::{LogEntry, LogStore, Version, EMPTY_VERSION};

/// Log store kept entirely in memory
#[derive(Debug, Default)]
pub struct InMemoryLogStore {
    entries: RwLock<Vec<LogEntry>>,
}

impl InMemoryLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of committed entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl LogStore for InMemoryLogStore {
    fn write_entry(&self, entry: &LogEntry) -> Result<()> {
        let mut entries = self.entries.write();
        let latest = entries.len() as Version;

        if entry.version != EMPTY_VERSION && entry.version <= latest {
            return Err(LakeTxError::VersionConflict {
                version: entry.version,
            });
        }
        if entry.version != latest + 1 {
            return Err(LakeTxError::VersionGap {
                version: entry.version,
                latest,
            });
        }

        entries.push(entry.clone());
        Ok(())
    }

    fn read_entry(&self, version: Version) -> Result<LogEntry> {
        let entries = self.entries.read();
        version
            .checked_sub(1)
            .and_then(|index| entries.get(index as usize))
            .cloned()
            .ok_or_else(|| LakeTxError::NotFound(format!("log version {}", version)))
    }

    fn latest_version(&self) -> Result<Version> {
        Ok(self.entries.read().len() as Version)
    }
}
