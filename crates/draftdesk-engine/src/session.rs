//! # Document Session
//!
//! The editing flow for one document: generated text becomes major versions,
//! a selection plus an instruction becomes a minor edit, and every history
//! change is mirrored into a [`SnapshotStore`].
//!
//! ## Persistence
//!
//! Store calls are best-effort. A failed load opens an empty history, a
//! failed save or delete is logged and the in-memory history carries on.
//!
//! ## Concurrency
//!
//! Operations take `&mut self`, so one session serves one caller at a time.
//! [`SharedSession`] extends that across threads and answers a second
//! concurrent caller with [`SessionError::Busy`] instead of queueing it.

use std::sync::{Arc, Mutex, TryLockError};

use draftdesk_config::{Config, DEFAULT_RETENTION_CAP};
use thiserror::Error;

use crate::blocks::{BlockId, BlockList};
use crate::collaborators::{CollaboratorError, Generator, PromptContext, TextEditor, require_text};
use crate::edit::{AppliedEdit, EditOutcome, apply_edit};
use crate::history::{Fingerprint, HistoryPatch, SnapshotId, VersionCommand, VersionHistory};
use crate::selection::{Selection, SelectionController};
use crate::store::{DocumentId, SnapshotStore};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Collaborator(#[from] CollaboratorError),
    #[error("No text is selected")]
    NoSelection,
    #[error("The selected text changed since it was selected")]
    StaleSelection,
    #[error("Another request is already in flight for this document")]
    Busy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions {
    pub retention_cap: usize,
    pub dedup: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            retention_cap: DEFAULT_RETENTION_CAP,
            dedup: true,
        }
    }
}

impl From<&Config> for SessionOptions {
    fn from(config: &Config) -> Self {
        Self {
            retention_cap: config.history.effective_cap(),
            dedup: config.history.dedup,
        }
    }
}

/// Result of a request that may create a major version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Commit {
    Created { id: SnapshotId, sequence: u64 },
    /// Same content already recorded for this document; nothing was created.
    Duplicate(Fingerprint),
}

impl Commit {
    pub fn is_created(&self) -> bool {
        matches!(self, Commit::Created { .. })
    }
}

#[derive(Debug)]
pub struct DocumentSession<S: SnapshotStore> {
    document_id: DocumentId,
    store: S,
    history: VersionHistory,
    selection: SelectionController,
    options: SessionOptions,
}

impl<S: SnapshotStore> DocumentSession<S> {
    /// Load `document_id` from `store` and restore its history.
    pub fn open(document_id: impl Into<DocumentId>, store: S, options: SessionOptions) -> Self {
        let document_id = document_id.into();
        let snapshots = store.load_snapshots(&document_id).unwrap_or_else(|e| {
            log::warn!("failed to load snapshots for {document_id}: {e}; starting empty");
            Vec::new()
        });

        let (history, evicted) = VersionHistory::restore(snapshots, options.retention_cap);
        let mut session = Self {
            document_id,
            store,
            history,
            selection: SelectionController::new(),
            options,
        };
        session.mirror(&HistoryPatch {
            evicted,
            ..HistoryPatch::default()
        });
        session
    }

    pub fn document_id(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn history(&self) -> &VersionHistory {
        &self.history
    }

    pub fn current_blocks(&self) -> Option<&BlockList> {
        self.history.current_blocks()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.selection()
    }

    pub fn options(&self) -> SessionOptions {
        self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Ask `generator` for new content and append it as a major version.
    ///
    /// A failing or blank generation leaves history untouched.
    pub fn generate(
        &mut self,
        generator: &dyn Generator,
        prompt: &PromptContext,
    ) -> Result<Commit, SessionError> {
        let text = require_text(generator.generate(prompt)?)?;
        let generated = BlockList::from_text(&text);

        let combined = match self.history.current_blocks() {
            Some(current) => current.concat(&generated),
            None => generated,
        };
        let description = Some(prompt.instruction.clone()).filter(|d| !d.is_empty());
        Ok(self.commit_major(combined, description))
    }

    /// Replace the whole document with `blocks` as a new major version.
    pub fn replace_all(&mut self, blocks: BlockList, description: Option<String>) -> Commit {
        self.commit_major(blocks, description)
    }

    /// Select `rendered` text inside block `block_id` of the current version.
    ///
    /// Returns `None` and leaves any prior selection alone when the block
    /// is not in the current version.
    pub fn select(&mut self, block_id: &BlockId, rendered: &str) -> Option<&Selection> {
        let block = self.history.current_blocks()?.find(block_id)?;
        self.selection
            .set_selection(Some(Selection::resolve(block, rendered)));
        self.selection.selection()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear_selection();
    }

    pub fn leave_document_view(&mut self) {
        self.selection.leave_document_view();
    }

    /// Rewrite the selected source text with `editor` and record the result
    /// as a minor edit of the current version.
    ///
    /// The editor sees the selection's Markdown source. Collaborator
    /// failures keep the selection so the user can retry.
    pub fn apply_instruction(
        &mut self,
        editor: &dyn TextEditor,
        instruction: &str,
    ) -> Result<AppliedEdit, SessionError> {
        let selection = self
            .selection
            .selection()
            .cloned()
            .ok_or(SessionError::NoSelection)?;
        let current = self.history.current_blocks().cloned().unwrap_or_default();
        if !selection.is_current(&current) {
            self.selection.clear_selection();
            return Err(SessionError::StaleSelection);
        }

        let edited = editor.edit_text(&selection.original_markdown, instruction)?;
        let replacement = require_text(edited)?;

        // `is_current` above guarantees the selected block exists.
        let EditOutcome::Applied { edit, .. } =
            apply_edit(&replacement, &mut self.selection, &current)
        else {
            return Err(SessionError::StaleSelection);
        };
        let patch = self.history.apply(VersionCommand::ReplaceBlockContent {
            block_id: edit.block_id.clone(),
            content: edit.new_content.clone(),
        });
        self.mirror(&patch);
        Ok(edit)
    }

    pub fn undo(&mut self) -> bool {
        self.navigate(VersionCommand::Undo)
    }

    pub fn redo(&mut self) -> bool {
        self.navigate(VersionCommand::Redo)
    }

    /// Move to the version carrying `sequence`. Unknown indices are ignored.
    pub fn switch_to_version(&mut self, sequence: u64) -> bool {
        self.navigate(VersionCommand::SwitchTo { sequence })
    }

    /// A selection points into one version's content, so moving the cursor drops it.
    fn navigate(&mut self, cmd: VersionCommand) -> bool {
        let patch = self.history.apply(cmd);
        if patch.cursor_moved {
            self.selection.clear_selection();
        }
        patch.cursor_moved
    }

    fn commit_major(&mut self, blocks: BlockList, description: Option<String>) -> Commit {
        let fingerprint = Fingerprint::of(&blocks);
        if self.options.dedup && self.is_duplicate(&fingerprint) {
            log::debug!(
                "skipping duplicate snapshot {fingerprint} for {}",
                self.document_id
            );
            return Commit::Duplicate(fingerprint);
        }

        let patch = self.history.create_major_version(blocks, description);
        self.selection.clear_selection();
        self.mirror(&patch);

        match self.history.current() {
            Some(snapshot) => Commit::Created {
                id: snapshot.id.clone(),
                sequence: snapshot.sequence,
            },
            None => Commit::Duplicate(fingerprint),
        }
    }

    fn is_duplicate(&self, fingerprint: &Fingerprint) -> bool {
        if self.history.contains_fingerprint(fingerprint) {
            return true;
        }
        self.store
            .snapshot_exists(&self.document_id, fingerprint)
            .unwrap_or_else(|e| {
                log::warn!("dedup lookup failed for {}: {e}", self.document_id);
                false
            })
    }

    /// Write `patch` through to the store. Failures are logged, never raised.
    fn mirror(&mut self, patch: &HistoryPatch) {
        for id in patch.created.iter().chain(patch.amended.iter()) {
            let Some(snapshot) = self.history.versions().iter().find(|s| &s.id == id) else {
                continue;
            };
            if let Err(e) = self.store.save_snapshot(&self.document_id, snapshot) {
                log::warn!(
                    "failed to save snapshot {} of {}: {e}",
                    snapshot.sequence,
                    self.document_id
                );
            }
        }

        let removed: Vec<SnapshotId> = patch.removed().cloned().collect();
        if !removed.is_empty()
            && let Err(e) = self.store.delete_snapshots(&self.document_id, &removed)
        {
            log::warn!(
                "failed to delete {} snapshots of {}: {e}",
                removed.len(),
                self.document_id
            );
        }
    }
}

/// Thread-safe handle with a single in-flight slot.
#[derive(Debug)]
pub struct SharedSession<S: SnapshotStore> {
    inner: Arc<Mutex<DocumentSession<S>>>,
}

impl<S: SnapshotStore> Clone for SharedSession<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: SnapshotStore> SharedSession<S> {
    pub fn new(session: DocumentSession<S>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `f` with exclusive access, or fail with `Busy` if another caller holds it.
    pub fn with<R>(&self, f: impl FnOnce(&mut DocumentSession<S>) -> R) -> Result<R, SessionError> {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Err(SessionError::Busy),
            // History commands never leave a half-applied state behind a panic.
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        Ok(f(&mut guard))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Block;
    use crate::history::Snapshot;
    use crate::store::{MemoryStore, StoreError};
    use pretty_assertions::assert_eq;

    /// Store whose writes always fail.
    #[derive(Debug, Default)]
    struct BrokenStore;

    impl SnapshotStore for BrokenStore {
        fn load_snapshots(&self, _: &DocumentId) -> Result<Vec<Snapshot>, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn save_snapshot(
            &mut self,
            _: &DocumentId,
            _: &Snapshot,
        ) -> Result<SnapshotId, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn snapshot_exists(&self, _: &DocumentId, _: &Fingerprint) -> Result<bool, StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }

        fn delete_snapshots(&mut self, _: &DocumentId, _: &[SnapshotId]) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("offline".into()))
        }
    }

    fn session() -> DocumentSession<MemoryStore> {
        DocumentSession::open("doc", MemoryStore::new(), SessionOptions::default())
    }

    fn generator(
        text: &'static str,
    ) -> impl Fn(&PromptContext) -> Result<String, CollaboratorError> {
        move |_: &PromptContext| Ok(text.to_string())
    }

    fn first_block_id(session: &DocumentSession<MemoryStore>) -> BlockId {
        session.current_blocks().unwrap()[0].id.clone()
    }

    #[test]
    fn options_follow_config() {
        let mut config = Config::default();
        config.history.retention_cap = 0;
        config.history.dedup = false;

        assert_eq!(
            SessionOptions::from(&config),
            SessionOptions {
                retention_cap: 1,
                dedup: false
            }
        );
    }

    #[test]
    fn generate_appends_major_versions_and_persists() {
        let mut session = session();
        session
            .generate(&generator("Intro.\n\nBody."), &PromptContext::new("draft"))
            .unwrap();
        let commit = session
            .generate(&generator("Outro."), &PromptContext::new("finish"))
            .unwrap();

        assert!(commit.is_created());
        assert_eq!(session.history().len(), 2);
        assert_eq!(
            session.current_blocks().unwrap().contents().collect::<Vec<_>>(),
            vec!["Intro.", "Body.", "Outro."]
        );
        assert_eq!(session.store().count(&DocumentId::from("doc")), 2);
        assert_eq!(
            session.history().current().unwrap().description.as_deref(),
            Some("finish")
        );
    }

    #[test]
    fn failed_generation_leaves_history_untouched() {
        let mut session = session();
        let failing = |_: &PromptContext| -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Generation("timeout".into()))
        };

        let err = session
            .generate(&failing, &PromptContext::new("draft"))
            .unwrap_err();
        assert!(matches!(err, SessionError::Collaborator(_)));

        let blank = session
            .generate(&generator("  \n\n "), &PromptContext::new("draft"))
            .unwrap_err();
        assert!(matches!(
            blank,
            SessionError::Collaborator(CollaboratorError::EmptyOutput)
        ));
        assert!(session.history().is_empty());
    }

    #[test]
    fn identical_replace_all_is_deduplicated() {
        let mut session = session();
        let blocks = BlockList::from_text("Same words.");

        assert!(session.replace_all(blocks.clone(), None).is_created());
        assert!(matches!(
            session.replace_all(blocks, None),
            Commit::Duplicate(_)
        ));
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.store().count(&DocumentId::from("doc")), 1);
    }

    #[test]
    fn dedup_can_be_disabled() {
        let mut session = DocumentSession::open(
            "doc",
            MemoryStore::new(),
            SessionOptions {
                dedup: false,
                ..SessionOptions::default()
            },
        );
        let blocks = BlockList::from_text("Same words.");

        session.replace_all(blocks.clone(), None);
        session.replace_all(blocks, None);

        assert_eq!(session.history().len(), 2);
    }

    #[test]
    fn instruction_edits_selection_in_place() {
        let mut session = session();
        session.replace_all(vec![Block::paragraph("The **quick** fox")].into(), None);
        let block_id = first_block_id(&session);
        session.select(&block_id, "quick").unwrap();

        let seen = std::cell::RefCell::new(String::new());
        let editor = |original: &str, _: &str| -> Result<String, CollaboratorError> {
            *seen.borrow_mut() = original.to_string();
            Ok("slow".to_string())
        };
        let edit = session.apply_instruction(&editor, "slower").unwrap();

        assert_eq!(seen.into_inner(), "quick");
        assert_eq!(edit.new_content, "The **slow** fox");
        assert_eq!(session.history().len(), 1);
        assert!(session.selection().is_none());

        let stored = session.store().load_snapshots(session.document_id()).unwrap();
        assert_eq!(stored[0].blocks.full_text(), "The **slow** fox");
    }

    #[test]
    fn instruction_without_selection_fails() {
        let mut session = session();
        session.replace_all(BlockList::from_text("text"), None);
        let editor =
            |_: &str, _: &str| -> Result<String, CollaboratorError> { Ok("x".to_string()) };

        assert!(matches!(
            session.apply_instruction(&editor, "go"),
            Err(SessionError::NoSelection)
        ));
    }

    #[test]
    fn instruction_on_changed_block_is_stale() {
        // Given a selection whose block is then rewritten behind the controller
        let mut session = session();
        session.replace_all(BlockList::from_text("The quick fox"), None);
        let block_id = first_block_id(&session);
        session.select(&block_id, "quick").unwrap();
        session.history.apply(VersionCommand::ReplaceBlockContent {
            block_id: block_id.clone(),
            content: "A slow dog".to_string(),
        });
        let called = std::cell::Cell::new(false);
        let editor = |_: &str, _: &str| -> Result<String, CollaboratorError> {
            called.set(true);
            Ok("fast".to_string())
        };

        // When the instruction is applied
        let err = session.apply_instruction(&editor, "faster").unwrap_err();

        // Then nothing is spliced and the selection is dropped
        assert!(matches!(err, SessionError::StaleSelection));
        assert!(!called.get());
        assert!(session.selection().is_none());
        assert_eq!(session.current_blocks().unwrap().full_text(), "A slow dog");
    }

    #[test]
    fn instruction_on_removed_block_is_stale() {
        let mut session = session();
        session.replace_all(BlockList::from_text("first"), None);
        let block_id = first_block_id(&session);
        session.select(&block_id, "first").unwrap();
        session
            .history
            .create_major_version(BlockList::from_text("second"), None);
        let editor =
            |_: &str, _: &str| -> Result<String, CollaboratorError> { Ok("x".to_string()) };

        let err = session.apply_instruction(&editor, "go").unwrap_err();

        assert!(matches!(err, SessionError::StaleSelection));
        assert_eq!(session.current_blocks().unwrap().full_text(), "second");
    }

    #[test]
    fn blank_edit_keeps_selection_and_content() {
        let mut session = session();
        session.replace_all(BlockList::from_text("keep this"), None);
        let block_id = first_block_id(&session);
        session.select(&block_id, "this");
        let editor =
            |_: &str, _: &str| -> Result<String, CollaboratorError> { Ok("   ".to_string()) };

        let err = session.apply_instruction(&editor, "erase").unwrap_err();

        assert!(matches!(
            err,
            SessionError::Collaborator(CollaboratorError::EmptyOutput)
        ));
        assert!(session.selection().is_some());
        assert_eq!(session.current_blocks().unwrap().full_text(), "keep this");
    }

    #[test]
    fn navigation_drops_selection() {
        let mut session = session();
        session.replace_all(BlockList::from_text("one"), None);
        session.replace_all(BlockList::from_text("two"), None);
        let block_id = first_block_id(&session);
        session.select(&block_id, "two");

        assert!(session.undo());
        assert!(session.selection().is_none());
        assert!(!session.undo());
        assert!(session.redo());
        assert!(!session.switch_to_version(99));
        assert!(session.switch_to_version(0));
        assert_eq!(session.current_blocks().unwrap().full_text(), "one");
    }

    #[test]
    fn select_unknown_block_is_ignored() {
        let mut session = session();
        session.replace_all(BlockList::from_text("text"), None);

        assert!(session.select(&BlockId::from("missing"), "text").is_none());
        assert!(session.selection().is_none());
    }

    #[test]
    fn reopening_restores_history_from_store() {
        let mut first = session();
        first.replace_all(BlockList::from_text("v0"), None);
        first.replace_all(BlockList::from_text("v1"), None);
        let store = first.store().clone();

        let reopened = DocumentSession::open("doc", store, SessionOptions::default());

        assert_eq!(reopened.history().len(), 2);
        assert_eq!(reopened.current_blocks().unwrap().full_text(), "v1");
    }

    #[test]
    fn branch_discard_and_eviction_delete_stored_rows() {
        let mut session = DocumentSession::open(
            "doc",
            MemoryStore::new(),
            SessionOptions {
                retention_cap: 2,
                dedup: true,
            },
        );
        let doc = DocumentId::from("doc");
        session.replace_all(BlockList::from_text("v0"), None);
        session.replace_all(BlockList::from_text("v1"), None);
        session.undo();
        session.replace_all(BlockList::from_text("v2"), None);
        assert_eq!(session.store().count(&doc), 2);

        session.replace_all(BlockList::from_text("v3"), None);

        let stored: Vec<String> = session
            .store()
            .load_snapshots(&doc)
            .unwrap()
            .iter()
            .map(|s| s.blocks.full_text())
            .collect();
        assert_eq!(stored, vec!["v2", "v3"]);
    }

    #[test]
    fn persistence_failures_never_block_the_session() {
        let mut session = DocumentSession::open("doc", BrokenStore, SessionOptions::default());
        assert!(session.history().is_empty());

        session.replace_all(BlockList::from_text("one"), None);
        session.replace_all(BlockList::from_text("two"), None);

        assert_eq!(session.history().len(), 2);
        assert!(session.undo());
        assert_eq!(session.current_blocks().unwrap().full_text(), "one");
    }

    #[test]
    fn shared_session_rejects_reentrant_caller() {
        let shared = SharedSession::new(session());
        let other = shared.clone();

        let nested = shared
            .with(|s| {
                s.replace_all(BlockList::from_text("text"), None);
                other.with(|_| ())
            })
            .unwrap();

        assert!(matches!(nested, Err(SessionError::Busy)));
        assert_eq!(shared.with(|s| s.history().len()).unwrap(), 1);
    }
}
