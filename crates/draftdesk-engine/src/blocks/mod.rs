//! # Block Store
//!
//! A document snapshot is an ordered list of [`Block`]s. Order is render
//! order. A block's `content` is Markdown source and only changes through a
//! splice or a full replacement.

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, Range};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::mapping::locate::floor_char_boundary;

/// Unique identifier for a block.
///
/// Fresh ids are UUID v4 strings, but any string read back from storage is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl BlockId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BlockId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for BlockId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// The kind of block. Only paragraphs exist today.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    #[default]
    Paragraph,
}

/// Opaque per-block key-value data carried through untouched.
pub type Metadata = BTreeMap<String, serde_json::Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    #[serde(rename = "type", default)]
    pub kind: BlockKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl Block {
    /// Create a paragraph block with a fresh id.
    pub fn paragraph(content: impl Into<String>) -> Self {
        Self {
            id: BlockId::new(),
            kind: BlockKind::Paragraph,
            content: content.into(),
            metadata: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<BlockId>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata
            .get_or_insert_with(Metadata::new)
            .insert(key.into(), value);
        self
    }

    /// Replace `range` of the content with `text`.
    ///
    /// The range is clamped to the content and snapped down to char
    /// boundaries, so a stale range can never panic.
    pub fn splice(&mut self, range: Range<usize>, text: &str) {
        let start = floor_char_boundary(&self.content, range.start);
        let end = floor_char_boundary(&self.content, range.end).max(start);
        self.content.replace_range(start..end, text);
    }
}

/// An ordered list of blocks forming one document snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockList(Vec<Block>);

impl BlockList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Split generated text into paragraph blocks.
    ///
    /// Paragraphs are separated by one or more blank lines. Each paragraph is
    /// trimmed and empty ones are dropped.
    pub fn from_text(text: &str) -> Self {
        split_paragraphs(text).into_iter().map(Block::paragraph).collect()
    }

    pub fn find(&self, id: &BlockId) -> Option<&Block> {
        self.0.iter().find(|b| &b.id == id)
    }

    pub fn find_mut(&mut self, id: &BlockId) -> Option<&mut Block> {
        self.0.iter_mut().find(|b| &b.id == id)
    }

    pub fn position(&self, id: &BlockId) -> Option<usize> {
        self.0.iter().position(|b| &b.id == id)
    }

    /// Replace a block's whole content. Returns false if the id is unknown.
    pub fn replace_content(&mut self, id: &BlockId, content: impl Into<String>) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.content = content.into();
                true
            }
            None => false,
        }
    }

    /// Splice `text` into a block at `range`. Returns false if the id is unknown.
    pub fn splice_content(&mut self, id: &BlockId, range: Range<usize>, text: &str) -> bool {
        match self.find_mut(id) {
            Some(block) => {
                block.splice(range, text);
                true
            }
            None => false,
        }
    }

    pub fn push(&mut self, block: Block) {
        self.0.push(block);
    }

    pub fn extend(&mut self, blocks: impl IntoIterator<Item = Block>) {
        self.0.extend(blocks);
    }

    /// Blocks of `self` followed by blocks of `other`.
    pub fn concat(&self, other: &BlockList) -> BlockList {
        self.0.iter().chain(other.0.iter()).cloned().collect()
    }

    /// All contents joined by a blank line, the inverse of [`BlockList::from_text`]
    /// for trimmed paragraphs.
    pub fn full_text(&self) -> String {
        self.0
            .iter()
            .map(|b| b.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn contents(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|b| b.content.as_str())
    }

    pub fn into_vec(self) -> Vec<Block> {
        self.0
    }
}

impl Deref for BlockList {
    type Target = [Block];

    fn deref(&self) -> &[Block] {
        &self.0
    }
}

impl From<Vec<Block>> for BlockList {
    fn from(blocks: Vec<Block>) -> Self {
        Self(blocks)
    }
}

impl FromIterator<Block> for BlockList {
    fn from_iter<I: IntoIterator<Item = Block>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for BlockList {
    type Item = Block;
    type IntoIter = std::vec::IntoIter<Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a BlockList {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Split text on runs of blank (whitespace-only) lines.
pub fn split_paragraphs(text: &str) -> Vec<String> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    fn flush(paragraphs: &mut Vec<String>, current: &mut Vec<&str>) {
        if current.is_empty() {
            return;
        }
        let joined = current.join("\n");
        let trimmed = joined.trim();
        if !trimmed.is_empty() {
            paragraphs.push(trimmed.to_string());
        }
        current.clear();
    }

    for line in text.lines() {
        if line.trim().is_empty() {
            flush(&mut paragraphs, &mut current);
        } else {
            current.push(line);
        }
    }
    flush(&mut paragraphs, &mut current);

    paragraphs
}
