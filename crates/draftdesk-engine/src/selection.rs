//! # Selection Controller
//!
//! Holds at most one active selection: which block, what the user saw, and
//! where that text lives in the block's Markdown source.

use std::ops::Range;

use crate::blocks::{Block, BlockId, BlockList};
use crate::mapping::{MatchStrategy, compute_offsets};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub block_id: BlockId,
    /// Rendered, marker-stripped text the user selected.
    pub selected_text: String,
    /// Exact source substring at `range`, formatting included.
    pub original_markdown: String,
    /// Byte offsets into the block's content.
    pub range: Range<usize>,
    /// How the offsets were found.
    pub strategy: MatchStrategy,
}

impl Selection {
    /// Map a rendered selection inside `block` back to its source offsets.
    pub fn resolve(block: &Block, rendered: &str) -> Self {
        let mapped = compute_offsets(&block.content, rendered);
        Self {
            block_id: block.id.clone(),
            selected_text: rendered.to_string(),
            original_markdown: block
                .content
                .get(mapped.range.clone())
                .unwrap_or_default()
                .to_string(),
            range: mapped.range,
            strategy: mapped.strategy,
        }
    }

    pub fn start_offset(&self) -> usize {
        self.range.start
    }

    pub fn end_offset(&self) -> usize {
        self.range.end
    }

    /// Whether the referenced block still holds `original_markdown` at `range`.
    pub fn is_current(&self, blocks: &BlockList) -> bool {
        blocks
            .find(&self.block_id)
            .and_then(|b| b.content.get(self.range.clone()))
            .is_some_and(|text| text == self.original_markdown)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SelectionController {
    active: Option<Selection>,
}

impl SelectionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the active selection. `None` clears it.
    pub fn set_selection(&mut self, selection: Option<Selection>) {
        self.active = selection;
    }

    pub fn clear_selection(&mut self) {
        self.active = None;
    }

    /// The hosting view left document-editing mode.
    pub fn leave_document_view(&mut self) {
        self.clear_selection();
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.active.as_ref()
    }

    pub fn has_selection(&self) -> bool {
        self.active.is_some()
    }
}
