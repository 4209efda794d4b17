//! In-memory storage
//!
//! Used by tests and ephemeral tables. Supports injecting write failures so
//! callers can exercise their I/O error paths.

use std::collections::{BTreeMap, BTreeSet};
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};

use bytes::Bytes;
use parking_lot::RwLock;

use crate::error::{LakeTxError, Result};

use super::{ByteStorage, PutOutcome};

/// Map-backed storage
#[derive(Default)]
pub struct MemoryStorage {
    objects: RwLock<BTreeMap<String, Bytes>>,
    dirs: RwLock<BTreeSet<String>>,
    fail_writes: AtomicBool,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with an I/O error (or stop doing so)
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Remove an object. Only tests that simulate damage should need this.
    pub fn remove(&self, path: &str) -> Option<Bytes> {
        self.objects.write().remove(path)
    }

    /// Number of stored objects
    pub fn object_count(&self) -> usize {
        self.objects.read().len()
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(LakeTxError::LogIo(io::Error::new(
                io::ErrorKind::Other,
                "injected write failure",
            )));
        }
        Ok(())
    }
}

impl ByteStorage for MemoryStorage {
    fn write(&self, path: &str, data: Bytes) -> Result<()> {
        self.check_writable()?;
        self.objects.write().insert(path.to_string(), data);
        Ok(())
    }

    fn put_if_absent(&self, path: &str, data: Bytes) -> Result<PutOutcome> {
        self.check_writable()?;
        let mut objects = self.objects.write();
        if objects.contains_key(path) {
            return Ok(PutOutcome::AlreadyExists);
        }
        objects.insert(path.to_string(), data);
        Ok(PutOutcome::Created)
    }

    fn read(&self, path: &str) -> Result<Bytes> {
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| LakeTxError::NotFound(path.to_string()))
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));
        let objects = self.objects.read();

        // BTreeMap iteration is already sorted
        Ok(objects
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, _)| {
                let name = &path[prefix.len()..];
                (!name.contains('/')).then(|| name.to_string())
            })
            .collect())
    }

    fn mkdir(&self, dir: &str) -> Result<()> {
        self.dirs.write().insert(dir.trim_end_matches('/').to_string());
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.objects.read().contains_key(path) || self.dirs.read().contains(path))
    }
}
