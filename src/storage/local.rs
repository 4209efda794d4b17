//! Local filesystem storage
//!
//! Objects are staged in hidden temp files next to their destination, then
//! published with `rename` (replace) or `hard_link` (create-if-absent).

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

use crate::config::SyncStrategy;
use crate::error::{LakeTxError, Result};

use super::{ByteStorage, PutOutcome};

/// Filesystem-backed storage rooted at a base directory
pub struct LocalStorage {
    /// Base directory; all paths resolve relative to it
    root: PathBuf,

    /// Whether writes are fsynced before they are published
    sync_strategy: SyncStrategy,

    /// Distinguishes concurrent temp files from the same process
    tmp_counter: AtomicU64,
}

impl LocalStorage {
    /// Open storage at `root`, creating the directory if needed
    pub fn open(root: impl Into<PathBuf>, sync_strategy: SyncStrategy) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;

        Ok(Self {
            root,
            sync_strategy,
            tmp_counter: AtomicU64::new(0),
        })
    }

    /// Get the root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.root.join(path)
    }

    /// Write `data` to a hidden temp file beside `target` and return its path
    fn stage(&self, target: &Path, data: &[u8]) -> Result<PathBuf> {
        let parent = target.parent().ok_or_else(|| {
            LakeTxError::NotFound(format!("no parent directory for {}", target.display()))
        })?;
        fs::create_dir_all(parent)?;

        let name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let seq = self.tmp_counter.fetch_add(1, Ordering::Relaxed);
        let tmp = parent.join(format!(".{}.{}-{}.tmp", name, std::process::id(), seq));

        let mut file = File::create(&tmp)?;
        if let Err(e) = file.write_all(data) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        if self.sync_strategy == SyncStrategy::EveryWrite {
            if let Err(e) = file.sync_all() {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
        }

        Ok(tmp)
    }

    /// Make a rename/link durable by syncing the containing directory
    fn sync_parent(&self, target: &Path) -> Result<()> {
        if self.sync_strategy != SyncStrategy::EveryWrite {
            return Ok(());
        }
        #[cfg(unix)]
        if let Some(parent) = target.parent() {
            File::open(parent)?.sync_all()?;
        }
        #[cfg(not(unix))]
        let _ = target;
        Ok(())
    }
}

impl ByteStorage for LocalStorage {
    fn write(&self, path: &str, data: Bytes) -> Result<()> {
        let target = self.resolve(path);
        let tmp = self.stage(&target, &data)?;

        if let Err(e) = fs::rename(&tmp, &target) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }

        // The object is visible under its final name from here on
        if let Err(e) = self.sync_parent(&target) {
            tracing::warn!(path, error = %e, "directory sync failed after publish");
        }
        Ok(())
    }

    fn put_if_absent(&self, path: &str, data: Bytes) -> Result<PutOutcome> {
        let target = self.resolve(path);
        let tmp = self.stage(&target, &data)?;

        // hard_link fails with AlreadyExists instead of replacing the target
        let outcome = match fs::hard_link(&tmp, &target) {
            Ok(()) => PutOutcome::Created,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => PutOutcome::AlreadyExists,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e.into());
            }
        };
        if let Err(e) = fs::remove_file(&tmp) {
            tracing::warn!(tmp = %tmp.display(), error = %e, "failed to remove staged file");
        }

        // A published object must not be reported as a failed write
        if outcome == PutOutcome::Created {
            if let Err(e) = self.sync_parent(&target) {
                tracing::warn!(path, error = %e, "directory sync failed after publish");
            }
        }
        Ok(outcome)
    }

    fn read(&self, path: &str) -> Result<Bytes> {
        match fs::read(self.resolve(path)) {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(LakeTxError::NotFound(path.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn list(&self, dir: &str) -> Result<Vec<String>> {
        let full = self.resolve(dir);
        if !full.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&full)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            // Staged temp files are never part of the listing
            if name.starts_with('.') {
                continue;
            }
            names.push(name);
        }
        names.sort();

        Ok(names)
    }

    fn mkdir(&self, dir: &str) -> Result<()> {
        fs::create_dir_all(self.resolve(dir))?;
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        Ok(self.resolve(path).exists())
    }
}
