//! Log store contract and the storage-backed implementation
//!
//! The storage-backed store maps each version to its own object and claims a
//! slot with the primitive's create-if-absent write, so two writers racing for
//! the same version cannot both succeed.

use std::sync::Arc;

use bytes::Bytes;

use crate::error::{LakeTxError, Result};
use crate::storage::{self, ByteStorage, PutOutcome};

use super::{LogEntry, Version, EMPTY_VERSION};

/// Directory (relative to the table root) holding log entries
pub const LOG_DIR: &str = "_log";

/// Append-only, version-addressed persistence of log entries.
///
/// Properties required from implementations:
/// - Atomic: a written entry is fully visible or not at all
/// - Write-once: an occupied version is never overwritten
/// - Gap-free: only `latest_version() + 1` may be written
pub trait LogStore: Send + Sync {
    /// Persist `entry` at `entry.version`.
    ///
    /// Fails with `VersionConflict` if the slot is taken and with
    /// `VersionGap` if it is not the next free slot.
    fn write_entry(&self, entry: &LogEntry) -> Result<()>;

    /// Read the entry at `version`, or fail with `NotFound`.
    fn read_entry(&self, version: Version) -> Result<LogEntry>;

    /// Highest committed version, or `EMPTY_VERSION` for an empty table.
    fn latest_version(&self) -> Result<Version>;

    /// Read entries `from..=to` in version order.
    fn read_range(&self, from: Version, to: Version) -> Result<Vec<LogEntry>> {
        (from.max(1)..=to).map(|v| self.read_entry(v)).collect()
    }
}

/// Log store persisted through a [`ByteStorage`] primitive
pub struct StorageLogStore<S> {
    storage: Arc<S>,
    log_dir: String,
}

impl<S: ByteStorage> StorageLogStore<S> {
    /// Open the log under the default `_log` directory
    pub fn open(storage: Arc<S>) -> Result<Self> {
        Self::open_in(storage, LOG_DIR)
    }

    /// Open the log under a custom directory
    pub fn open_in(storage: Arc<S>, log_dir: impl Into<String>) -> Result<Self> {
        let log_dir = log_dir.into();
        storage.mkdir(&log_dir)?;

        Ok(Self { storage, log_dir })
    }

    /// Storage path of the entry for `version`
    pub fn entry_path(&self, version: Version) -> String {
        storage::join(&self.log_dir, &format!("{:020}.entry", version))
    }

    pub fn log_dir(&self) -> &str {
        &self.log_dir
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Parse a version from an entry file name
    /// "00000000000000000042.entry" → Some(42)
    pub(crate) fn parse_version(name: &str) -> Option<Version> {
        let digits = name.strip_suffix(".entry")?;
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        digits.parse().ok()
    }
}

impl<S: ByteStorage> LogStore for StorageLogStore<S> {
    fn write_entry(&self, entry: &LogEntry) -> Result<()> {
        let version = entry.version;

        // Entries are never deleted, so "v-1 exists" plus "v absent" means v
        // is exactly the next free slot
        let predecessor_present =
            version == 1 || (version > 1 && self.storage.exists(&self.entry_path(version - 1))?);
        if !predecessor_present {
            let latest = self.latest_version()?;
            if version != EMPTY_VERSION && version <= latest {
                return Err(LakeTxError::VersionConflict { version });
            }
            return Err(LakeTxError::VersionGap { version, latest });
        }

        let path = self.entry_path(version);
        let bytes = Bytes::from(entry.serialize()?);
        let outcome = match self.storage.put_if_absent(&path, bytes.clone()) {
            Ok(outcome) => outcome,
            // The storage may fail after the object became visible. What is
            // stored at `path` decides whether this write happened.
            Err(e) => match self.storage.read(&path) {
                Ok(stored) if stored == bytes => {
                    tracing::warn!(version, error = %e, "log entry published despite storage error");
                    PutOutcome::Created
                }
                Ok(_) => PutOutcome::AlreadyExists,
                Err(_) => return Err(e),
            },
        };

        match outcome {
            PutOutcome::Created => {
                tracing::debug!(version, "log entry written");
                Ok(())
            }
            PutOutcome::AlreadyExists => Err(LakeTxError::VersionConflict { version }),
        }
    }

    fn read_entry(&self, version: Version) -> Result<LogEntry> {
        let bytes = match self.storage.read(&self.entry_path(version)) {
            Ok(bytes) => bytes,
            Err(LakeTxError::NotFound(_)) => {
                return Err(LakeTxError::NotFound(format!("log version {}", version)))
            }
            Err(e) => return Err(e),
        };

        let entry = LogEntry::deserialize(&bytes)?;
        if entry.version != version {
            return Err(LakeTxError::Corruption(format!(
                "object for version {} holds version {}",
                version, entry.version
            )));
        }

        Ok(entry)
    }

    fn latest_version(&self) -> Result<Version> {
        Ok(self
            .storage
            .list(&self.log_dir)?
            .iter()
            .filter_map(|name| Self::parse_version(name))
            .max()
            .unwrap_or(EMPTY_VERSION))
    }
}
