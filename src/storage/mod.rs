//! Storage Module
//!
//! Narrow byte-storage primitive the transaction log persists through.
//!
//! ## Responsibilities
//! - Atomic whole-object writes (replace, or create-if-absent)
//! - Reads that fail for absent objects
//! - Sorted directory listing
//! - Idempotent directory creation
//!
//! The log never sees partially written objects: both implementations publish
//! an object under its final name in a single step.

mod local;
mod memory;

use bytes::Bytes;

use crate::error::Result;

pub use local::LocalStorage;
pub use memory::MemoryStorage;

/// Outcome of a create-if-absent write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The object did not exist and is now visible
    Created,

    /// Another writer got there first; nothing was written
    AlreadyExists,
}

/// Byte storage primitive, addressed by `/`-separated relative paths.
///
/// Implementations must make every write atomic: readers observe either the
/// previous object (or none) or the complete new one.
pub trait ByteStorage: Send + Sync {
    /// Write an object, replacing any existing one.
    fn write(&self, path: &str, data: Bytes) -> Result<()>;

    /// Write an object only if nothing exists at `path`.
    fn put_if_absent(&self, path: &str, data: Bytes) -> Result<PutOutcome>;

    /// Read an object. Fails with `NotFound` if absent.
    fn read(&self, path: &str) -> Result<Bytes>;

    /// List object names (not subdirectories) directly under `dir`, sorted.
    /// An absent directory lists as empty.
    fn list(&self, dir: &str) -> Result<Vec<String>>;

    /// Create a directory. Idempotent.
    fn mkdir(&self, dir: &str) -> Result<()>;

    /// Check whether an object exists.
    fn exists(&self, path: &str) -> Result<bool>;
}

/// Join a directory and a name into a storage path
pub(crate) fn join(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", dir, name)
    }
}
