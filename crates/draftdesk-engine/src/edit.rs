//! # Edit Applicator
//!
//! Splices replacement text into the selected block at the stored source
//! offsets. Versioning policy stays with the caller: turn the outcome into a
//! minor edit with [`EditOutcome::into_command`].

use std::ops::Range;

use crate::blocks::{BlockId, BlockList};
use crate::history::VersionCommand;
use crate::selection::{Selection, SelectionController};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedEdit {
    pub block_id: BlockId,
    /// Source range that was replaced, in the block's previous content.
    pub replaced: Range<usize>,
    /// The block's content after the splice.
    pub new_content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditOutcome {
    Applied { blocks: BlockList, edit: AppliedEdit },
    /// No selection, or its block is gone. Blocks are returned as they were.
    Unchanged(BlockList),
}

impl EditOutcome {
    pub fn blocks(&self) -> &BlockList {
        match self {
            EditOutcome::Applied { blocks, .. } | EditOutcome::Unchanged(blocks) => blocks,
        }
    }

    pub fn into_blocks(self) -> BlockList {
        match self {
            EditOutcome::Applied { blocks, .. } | EditOutcome::Unchanged(blocks) => blocks,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, EditOutcome::Applied { .. })
    }

    /// The minor-edit command that records this outcome, if anything changed.
    pub fn into_command(self) -> Option<VersionCommand> {
        match self {
            EditOutcome::Applied { edit, .. } => Some(VersionCommand::ReplaceBlockContent {
                block_id: edit.block_id,
                content: edit.new_content,
            }),
            EditOutcome::Unchanged(_) => None,
        }
    }
}

/// Splice `new_text` over the active selection in `blocks`.
///
/// Clears the selection after a successful splice and only then.
pub fn apply_edit(
    new_text: &str,
    controller: &mut SelectionController,
    blocks: &BlockList,
) -> EditOutcome {
    let Some(selection) = controller.selection() else {
        return EditOutcome::Unchanged(blocks.clone());
    };

    match splice_selection(blocks, selection, new_text) {
        Some((updated, edit)) => {
            controller.clear_selection();
            EditOutcome::Applied {
                blocks: updated,
                edit,
            }
        }
        None => EditOutcome::Unchanged(blocks.clone()),
    }
}

/// Pure splice: `content[..start] + new_text + content[end..]` for the
/// selected block. `None` when the block no longer exists.
pub fn splice_selection(
    blocks: &BlockList,
    selection: &Selection,
    new_text: &str,
) -> Option<(BlockList, AppliedEdit)> {
    let mut updated = blocks.clone();
    let block = updated.find_mut(&selection.block_id)?;
    block.splice(selection.range.clone(), new_text);
    let edit = AppliedEdit {
        block_id: block.id.clone(),
        replaced: selection.range.clone(),
        new_content: block.content.clone(),
    };
    Some((updated, edit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blocks::Block;
    use crate::history::VersionHistory;
    use pretty_assertions::assert_eq;

    fn select(controller: &mut SelectionController, block: &Block, rendered: &str) {
        controller.set_selection(Some(Selection::resolve(block, rendered)));
    }

    #[test]
    fn splices_inside_emphasis() {
        let blocks: BlockList = vec![Block::paragraph("The **quick** fox")].into();
        let mut controller = SelectionController::new();
        select(&mut controller, &blocks[0], "quick");

        let outcome = apply_edit("slow", &mut controller, &blocks);

        assert!(outcome.is_applied());
        assert_eq!(outcome.blocks()[0].content, "The **slow** fox");
        assert!(!controller.has_selection());
    }

    #[test]
    fn only_selected_block_changes() {
        let blocks = BlockList::from_text("keep me\n\nedit me\n\nkeep too");
        let mut controller = SelectionController::new();
        select(&mut controller, &blocks[1], "edit");

        let outcome = apply_edit("changed", &mut controller, &blocks);

        assert_eq!(
            outcome.blocks().contents().collect::<Vec<_>>(),
            vec!["keep me", "changed me", "keep too"]
        );
        assert_eq!(outcome.blocks()[1].id, blocks[1].id);
    }

    #[test]
    fn no_selection_is_noop() {
        let blocks = BlockList::from_text("text");
        let mut controller = SelectionController::new();

        let outcome = apply_edit("x", &mut controller, &blocks);

        assert_eq!(outcome, EditOutcome::Unchanged(blocks));
        assert!(outcome.into_command().is_none());
    }

    #[test]
    fn missing_block_is_noop_and_keeps_selection() {
        let old = BlockList::from_text("gone");
        let regenerated = BlockList::from_text("new content");
        let mut controller = SelectionController::new();
        select(&mut controller, &old[0], "gone");

        let outcome = apply_edit("x", &mut controller, &regenerated);

        assert!(!outcome.is_applied());
        assert_eq!(outcome.into_blocks(), regenerated);
        assert!(controller.has_selection());
    }

    #[test]
    fn outcome_becomes_minor_edit() {
        let mut history = VersionHistory::new(10);
        history.create_major_version(BlockList::from_text("The **quick** fox"), None);
        let current = history.current_blocks().cloned().unwrap_or_default();

        let mut controller = SelectionController::new();
        select(&mut controller, &current[0], "quick");
        let command = apply_edit("slow", &mut controller, &current)
            .into_command()
            .unwrap();
        let patch = history.apply(command);

        assert!(patch.amended.is_some());
        assert_eq!(history.len(), 1);
        assert_eq!(
            history.current_blocks().map(|b| b.full_text()),
            Some("The **slow** fox".to_string())
        );
    }
}
