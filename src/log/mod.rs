//! Transaction Log Module
//!
//! Append-only, version-addressed record of every committed transaction.
//!
//! ## Responsibilities
//! - Assign each version exactly once (compare-and-set on the next free slot)
//! - Persist entries atomically: an entry is fully visible or not at all
//! - CRC32 checksums for corruption detection
//! - Integrity verification of a persisted log
//!
//! ## Entry Format
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ _log/00000000000000000001.entry             │
//! │ ┌─────────────┬─────────┬─────────┬───────┐ │
//! │ │ Version (8) │ CRC (4) │ Len (4) │ Data  │ │
//! │ └─────────────┴─────────┴─────────┴───────┘ │
//! └─────────────────────────────────────────────┘
//! ```
//! `Data` is the bincode encoding of a [`LogEntry`]. One object per version.

mod entry;
mod memory;
mod recovery;
mod store;

pub use entry::{LogEntry, Operation, Version, EMPTY_VERSION, HEADER_SIZE};
pub use memory::InMemoryLogStore;
pub use recovery::VerifyReport;
pub use store::{LogStore, StorageLogStore, LOG_DIR};
