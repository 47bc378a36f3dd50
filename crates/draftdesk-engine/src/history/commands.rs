use std::ops::Range;

use crate::blocks::{BlockId, BlockList};
use crate::history::SnapshotId;

/// A state transition over [`VersionHistory`](crate::history::VersionHistory).
#[derive(Debug, Clone, PartialEq)]
pub enum VersionCommand {
    /// Drop everything after the cursor and append a snapshot of `blocks`.
    CreateMajor {
        blocks: BlockList,
        description: Option<String>,
    },
    /// Append blocks to the document. A major append creates a new snapshot
    /// holding the current blocks plus `blocks`; a minor one extends the
    /// current snapshot in place.
    AppendBlocks {
        blocks: BlockList,
        major: bool,
        description: Option<String>,
    },
    /// Replace one block's whole content in the current snapshot.
    ReplaceBlockContent { block_id: BlockId, content: String },
    /// Splice `text` over `range` of one block in the current snapshot.
    SpliceBlockContent {
        block_id: BlockId,
        range: Range<usize>,
        text: String,
    },
    Undo,
    Redo,
    /// Move the cursor to the snapshot carrying this sequence index.
    SwitchTo { sequence: u64 },
}

/// What a command changed, for mirroring into durable storage.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HistoryPatch {
    /// New snapshot appended at the end.
    pub created: Option<SnapshotId>,
    /// Current snapshot rewritten in place.
    pub amended: Option<SnapshotId>,
    /// Snapshots after the cursor dropped by a new major version.
    pub discarded: Vec<SnapshotId>,
    /// Oldest snapshots dropped by the retention cap.
    pub evicted: Vec<SnapshotId>,
    pub cursor_moved: bool,
}

impl HistoryPatch {
    pub fn is_noop(&self) -> bool {
        self == &HistoryPatch::default()
    }

    /// Every snapshot id that no longer exists after this command.
    pub fn removed(&self) -> impl Iterator<Item = &SnapshotId> {
        self.discarded.iter().chain(self.evicted.iter())
    }
}
