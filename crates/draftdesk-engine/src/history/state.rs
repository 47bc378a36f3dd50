use draftdesk_config::DEFAULT_RETENTION_CAP;

use crate::blocks::BlockList;
use crate::history::{Fingerprint, HistoryPatch, Snapshot, SnapshotId, VersionCommand};

/// Linear, bounded version history for one document.
///
/// Invariants:
/// - `cursor` is `None` iff `versions` is empty, otherwise a valid index.
/// - sequence indices strictly increase along `versions`.
/// - `versions.len() <= cap` after every command.
///
/// Unknown block ids and sequence indices are treated as stale references:
/// the command is a no-op and the returned patch is empty.
#[derive(Debug, Clone, PartialEq)]
pub struct VersionHistory {
    versions: Vec<Snapshot>,
    cursor: Option<usize>,
    cap: usize,
    /// Next sequence index to hand out. Never reused, also after truncation.
    next_sequence: u64,
}

impl Default for VersionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_RETENTION_CAP)
    }
}

impl VersionHistory {
    /// Empty history keeping at most `cap` snapshots (at least 1).
    pub fn new(cap: usize) -> Self {
        Self {
            versions: Vec::new(),
            cursor: None,
            cap: cap.max(1),
            next_sequence: 0,
        }
    }

    /// Rebuild history from persisted snapshots.
    ///
    /// Snapshots are ordered by sequence index and trimmed to the newest
    /// `cap`; the cursor lands on the newest. Returns the ids trimmed away.
    pub fn restore(mut snapshots: Vec<Snapshot>, cap: usize) -> (Self, Vec<SnapshotId>) {
        snapshots.sort_by_key(|s| s.sequence);
        snapshots.dedup_by_key(|s| s.sequence);

        let next_sequence = snapshots.last().map_or(0, |s| s.sequence.saturating_add(1));
        let mut history = Self {
            cursor: snapshots.len().checked_sub(1),
            versions: snapshots,
            cap: cap.max(1),
            next_sequence,
        };
        let evicted = history.enforce_cap();
        (history, evicted)
    }

    /// Apply a command, returning what changed.
    pub fn apply(&mut self, cmd: VersionCommand) -> HistoryPatch {
        match cmd {
            VersionCommand::CreateMajor {
                blocks,
                description,
            } => self.create_major(blocks, description),
            VersionCommand::AppendBlocks {
                blocks,
                major,
                description,
            } => self.append_blocks(blocks, major, description),
            VersionCommand::ReplaceBlockContent { block_id, content } => {
                self.amend_current(|blocks| blocks.replace_content(&block_id, content))
            }
            VersionCommand::SpliceBlockContent {
                block_id,
                range,
                text,
            } => self.amend_current(|blocks| blocks.splice_content(&block_id, range, &text)),
            VersionCommand::Undo => self.move_cursor(self.cursor.map(|c| c.saturating_sub(1))),
            VersionCommand::Redo => {
                let last = self.versions.len().saturating_sub(1);
                self.move_cursor(self.cursor.map(|c| (c + 1).min(last)))
            }
            VersionCommand::SwitchTo { sequence } => {
                let target = self.versions.iter().position(|s| s.sequence == sequence);
                match target {
                    Some(index) => self.move_cursor(Some(index)),
                    None => HistoryPatch::default(),
                }
            }
        }
    }

    pub fn create_major_version(
        &mut self,
        blocks: BlockList,
        description: Option<String>,
    ) -> HistoryPatch {
        self.apply(VersionCommand::CreateMajor {
            blocks,
            description,
        })
    }

    /// Explicit replace-all: the whole document becomes `blocks`.
    pub fn replace_all(&mut self, blocks: BlockList, description: Option<String>) -> HistoryPatch {
        self.create_major_version(blocks, description)
    }

    pub fn undo(&mut self) -> HistoryPatch {
        self.apply(VersionCommand::Undo)
    }

    pub fn redo(&mut self) -> HistoryPatch {
        self.apply(VersionCommand::Redo)
    }

    pub fn switch_to_version(&mut self, sequence: u64) -> HistoryPatch {
        self.apply(VersionCommand::SwitchTo { sequence })
    }

    /// Change the retention cap, evicting immediately if the history is now too long.
    pub fn set_cap(&mut self, cap: usize) -> Vec<SnapshotId> {
        self.cap = cap.max(1);
        self.enforce_cap()
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.cursor.and_then(|c| self.versions.get(c))
    }

    pub fn current_blocks(&self) -> Option<&BlockList> {
        self.current().map(|s| &s.blocks)
    }

    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn versions(&self) -> &[Snapshot] {
        &self.versions
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn cap(&self) -> usize {
        self.cap
    }

    pub fn can_undo(&self) -> bool {
        self.cursor.is_some_and(|c| c > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.is_some_and(|c| c + 1 < self.versions.len())
    }

    pub fn find_by_sequence(&self, sequence: u64) -> Option<&Snapshot> {
        self.versions.iter().find(|s| s.sequence == sequence)
    }

    pub fn contains_fingerprint(&self, fingerprint: &Fingerprint) -> bool {
        self.versions.iter().any(|s| &s.fingerprint == fingerprint)
    }

    fn create_major(&mut self, blocks: BlockList, description: Option<String>) -> HistoryPatch {
        let keep = self.cursor.map_or(0, |c| c + 1);
        let discarded = self
            .versions
            .drain(keep..)
            .map(|s| s.id)
            .collect::<Vec<_>>();

        let snapshot = Snapshot::new(self.next_sequence, blocks, description);
        self.next_sequence = self.next_sequence.saturating_add(1);
        let created = snapshot.id.clone();
        self.versions.push(snapshot);
        self.cursor = Some(self.versions.len() - 1);

        let evicted = self.enforce_cap();
        HistoryPatch {
            created: Some(created),
            discarded,
            evicted,
            cursor_moved: true,
            ..HistoryPatch::default()
        }
    }

    fn append_blocks(
        &mut self,
        blocks: BlockList,
        major: bool,
        description: Option<String>,
    ) -> HistoryPatch {
        match self.current_blocks() {
            Some(current) if !major => {
                if blocks.is_empty() {
                    return HistoryPatch::default();
                }
                let combined = current.concat(&blocks);
                self.amend_current(move |target| {
                    *target = combined;
                    true
                })
            }
            Some(current) => {
                let combined = current.concat(&blocks);
                self.create_major(combined, description)
            }
            None => self.create_major(blocks, description),
        }
    }

    /// Rewrite the current snapshot in place. `edit` returns false when its
    /// target does not exist; an edit that leaves the blocks unchanged is a no-op.
    fn amend_current(&mut self, edit: impl FnOnce(&mut BlockList) -> bool) -> HistoryPatch {
        let Some(current) = self.cursor.and_then(|c| self.versions.get_mut(c)) else {
            return HistoryPatch::default();
        };

        let mut blocks = current.blocks.clone();
        if !edit(&mut blocks) || blocks == current.blocks {
            return HistoryPatch::default();
        }

        *current = current.amended(blocks);
        HistoryPatch {
            amended: Some(current.id.clone()),
            ..HistoryPatch::default()
        }
    }

    fn move_cursor(&mut self, target: Option<usize>) -> HistoryPatch {
        if target == self.cursor || target.is_none() {
            return HistoryPatch::default();
        }
        self.cursor = target;
        HistoryPatch {
            cursor_moved: true,
            ..HistoryPatch::default()
        }
    }

    /// Evict from the front until at most `cap` snapshots remain.
    fn enforce_cap(&mut self) -> Vec<SnapshotId> {
        let excess = self.versions.len().saturating_sub(self.cap);
        if excess == 0 {
            return Vec::new();
        }

        let evicted = self
            .versions
            .drain(..excess)
            .map(|s| s.id)
            .collect::<Vec<_>>();

        if let Some(cursor) = self.cursor {
            if cursor < excess {
                log::warn!(
                    "retention evicted the snapshot under the cursor \
                     (cursor {cursor}, evicted {excess}); clamping to oldest"
                );
            }
            self.cursor = Some(cursor.saturating_sub(excess));
        }
        evicted
    }
}

/// Pure form of [`VersionHistory::apply`]: returns the next state and the
/// patch, leaving `state` untouched.
pub fn transition(state: &VersionHistory, cmd: VersionCommand) -> (VersionHistory, HistoryPatch) {
    let mut next = state.clone();
    let patch = next.apply(cmd);
    (next, patch)
}
