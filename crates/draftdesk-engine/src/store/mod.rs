//! # Snapshot Persistence
//!
//! Durable storage for a document's snapshots. The session mirrors every
//! [`HistoryPatch`](crate::history::HistoryPatch) into a store but never
//! depends on a write succeeding: in-memory state stays authoritative.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::history::{Fingerprint, Snapshot, SnapshotId};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed snapshot record {path}: {source}")]
    Malformed {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Invalid document id: {0:?}")]
    InvalidDocumentId(String),
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Identifier of the document a history belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(pub String);

impl DocumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for DocumentId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for DocumentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

pub trait SnapshotStore {
    /// All persisted snapshots of `document`, ordered by sequence index.
    /// An unknown document has none.
    fn load_snapshots(&self, document: &DocumentId) -> Result<Vec<Snapshot>, StoreError>;

    /// Insert or overwrite the record with `snapshot.id`.
    fn save_snapshot(
        &mut self,
        document: &DocumentId,
        snapshot: &Snapshot,
    ) -> Result<SnapshotId, StoreError>;

    fn snapshot_exists(
        &self,
        document: &DocumentId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError>;

    /// Remove the listed records. Ids that are not stored are ignored.
    fn delete_snapshots(
        &mut self,
        document: &DocumentId,
        ids: &[SnapshotId],
    ) -> Result<(), StoreError>;
}

impl<S: SnapshotStore + ?Sized> SnapshotStore for Box<S> {
    fn load_snapshots(&self, document: &DocumentId) -> Result<Vec<Snapshot>, StoreError> {
        (**self).load_snapshots(document)
    }

    fn save_snapshot(
        &mut self,
        document: &DocumentId,
        snapshot: &Snapshot,
    ) -> Result<SnapshotId, StoreError> {
        (**self).save_snapshot(document, snapshot)
    }

    fn snapshot_exists(
        &self,
        document: &DocumentId,
        fingerprint: &Fingerprint,
    ) -> Result<bool, StoreError> {
        (**self).snapshot_exists(document, fingerprint)
    }

    fn delete_snapshots(
        &mut self,
        document: &DocumentId,
        ids: &[SnapshotId],
    ) -> Result<(), StoreError> {
        (**self).delete_snapshots(document, ids)
    }
}
