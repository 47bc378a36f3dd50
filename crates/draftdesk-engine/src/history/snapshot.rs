use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::blocks::BlockList;

/// Unique identifier for a snapshot row.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(pub String);

impl SnapshotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SnapshotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SnapshotId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Order-sensitive content hash of a block list.
///
/// BLAKE3 over each block's content, framed by its little-endian `u64` byte
/// length, rendered as 64 lowercase hex digits. The value is persisted, so
/// the framing must not change.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(pub String);

impl Fingerprint {
    pub fn of(blocks: &BlockList) -> Self {
        let mut hasher = blake3::Hasher::new();
        // Length prefixes keep ["ab", "c"] and ["a", "bc"] apart.
        for content in blocks.contents() {
            hasher.update(&(content.len() as u64).to_le_bytes());
            hasher.update(content.as_bytes());
        }
        Self(hasher.finalize().to_hex().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One recorded version of a document. Field names match the persisted record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub id: SnapshotId,
    /// Stable, strictly increasing number. Survives eviction, unlike array positions.
    #[serde(rename = "sequence_index")]
    pub sequence: u64,
    pub blocks: BlockList,
    pub fingerprint: Fingerprint,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Snapshot {
    pub fn new(sequence: u64, blocks: BlockList, description: Option<String>) -> Self {
        Self {
            id: SnapshotId::new(),
            sequence,
            fingerprint: Fingerprint::of(&blocks),
            blocks,
            created_at: Utc::now(),
            description,
        }
    }

    /// Same snapshot (id and sequence) with new blocks, fingerprint and timestamp.
    pub fn amended(&self, blocks: BlockList) -> Self {
        Self {
            id: self.id.clone(),
            sequence: self.sequence,
            fingerprint: Fingerprint::of(&blocks),
            blocks,
            created_at: Utc::now(),
            description: self.description.clone(),
        }
    }
}
