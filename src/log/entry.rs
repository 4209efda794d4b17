//! Log entry definitions
//!
//! Defines the structure of individual log entries and their framing.

use std::collections::{BTreeMap, HashSet};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{LakeTxError, Result};
use crate::schema::{Schema, SchemaId};

/// Table version. Versions start at 1 and never skip.
pub type Version = u64;

/// Sentinel returned as the latest version of an empty table
pub const EMPTY_VERSION: Version = 0;

/// Header size: Version (8) + CRC (4) + Len (4)
pub const HEADER_SIZE: usize = 16;

/// What a committed transaction changed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Data files that become live
    pub added: Vec<String>,

    /// Data files that stop being live
    pub removed: Vec<String>,

    /// New table schema, if this transaction changes it
    pub schema: Option<Schema>,

    /// Free-form facts about the commit (operation name, writer, ...)
    pub commit_info: BTreeMap<String, String>,
}

impl Operation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(mut self, path: impl Into<String>) -> Self {
        self.added.push(path.into());
        self
    }

    pub fn remove_file(mut self, path: impl Into<String>) -> Self {
        self.removed.push(path.into());
        self
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn with_info(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.commit_info.insert(key.into(), value.into());
        self
    }

    /// Fold `other` into `self`. A schema in `other` replaces ours.
    ///
    /// Paths are appended as-is; call [`Operation::dedup`] once staging is done.
    pub fn merge(&mut self, other: Operation) {
        self.added.extend(other.added);
        self.removed.extend(other.removed);
        if other.schema.is_some() {
            self.schema = other.schema;
        }
        self.commit_info.extend(other.commit_info);
    }

    /// Drop repeated paths, keeping the first occurrence of each
    pub fn dedup(&mut self) {
        dedup_paths(&mut self.added);
        dedup_paths(&mut self.removed);
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.schema.is_none()
            && self.commit_info.is_empty()
    }
}

fn dedup_paths(paths: &mut Vec<String>) {
    let mut seen = HashSet::with_capacity(paths.len());
    paths.retain(|path| seen.insert(path.clone()));
}

/// Immutable record of one committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Version this entry occupies
    pub version: Version,

    /// Timestamp (unix millis) when the entry was created
    pub timestamp: u64,

    /// The change itself
    pub operation: Operation,

    /// Schema in force as of this version (None until a schema is committed)
    pub schema_id: Option<SchemaId>,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(version: Version, operation: Operation, schema_id: Option<SchemaId>) -> Self {
        Self {
            version,
            timestamp: now_millis(),
            operation,
            schema_id,
        }
    }

    /// Encode as `[version][crc][len][bincode payload]`
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let payload =
            bincode::serialize(self).map_err(|e| LakeTxError::Serialization(e.to_string()))?;
        let len = u32::try_from(payload.len()).map_err(|_| {
            LakeTxError::Serialization(format!("entry payload too large: {} bytes", payload.len()))
        })?;

        let mut bytes = Vec::with_capacity(HEADER_SIZE + payload.len());
        bytes.extend_from_slice(&self.version.to_le_bytes());
        bytes.extend_from_slice(&Self::compute_crc(&payload).to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&payload);

        Ok(bytes)
    }

    /// Decode and verify a framed entry
    pub fn deserialize(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < HEADER_SIZE {
            return Err(LakeTxError::Corruption(format!(
                "entry too short: {} bytes",
                bytes.len()
            )));
        }

        let (header, payload) = bytes.split_at(HEADER_SIZE);
        let mut version = [0u8; 8];
        let mut crc = [0u8; 4];
        let mut len = [0u8; 4];
        version.copy_from_slice(&header[0..8]);
        crc.copy_from_slice(&header[8..12]);
        len.copy_from_slice(&header[12..16]);

        let version = u64::from_le_bytes(version);
        let expected_crc = u32::from_le_bytes(crc);
        let len = u32::from_le_bytes(len) as usize;

        if payload.len() != len {
            return Err(LakeTxError::Corruption(format!(
                "entry {} declares {} payload bytes, found {}",
                version,
                len,
                payload.len()
            )));
        }

        let actual_crc = Self::compute_crc(payload);
        if actual_crc != expected_crc {
            return Err(LakeTxError::Corruption(format!(
                "entry {} checksum mismatch: expected {:08x}, got {:08x}",
                version, expected_crc, actual_crc
            )));
        }

        let entry: LogEntry =
            bincode::deserialize(payload).map_err(|e| LakeTxError::Serialization(e.to_string()))?;

        if entry.version != version {
            return Err(LakeTxError::Corruption(format!(
                "entry header says version {}, payload says {}",
                version, entry.version
            )));
        }

        Ok(entry)
    }

    pub fn compute_crc(payload: &[u8]) -> u32 {
        crc32fast::hash(payload)
    }
}

/// Milliseconds since the unix epoch
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
