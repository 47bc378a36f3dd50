use std::ops::Range;
use std::sync::OnceLock;

use regex::Regex;

use super::strip::{StrippedText, strip_emphasis};

static WHITESPACE_RUN: OnceLock<Regex> = OnceLock::new();

/// Which step of the fallback chain produced a [`MappedRange`].
///
/// Variants are ordered from most to least precise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchStrategy {
    /// Found verbatim in the marker-stripped text.
    Exact,
    /// Found after collapsing whitespace runs in both strings.
    WhitespaceNormalized,
    /// Found verbatim in the raw Markdown source.
    RawSubstring,
    /// Only the first word of the selection was found in the source.
    FirstWord,
    /// Nothing matched; the range starts at 0.
    Fallback,
}

/// Source offsets for a rendered selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedRange {
    /// Byte range into the block's Markdown source.
    pub range: Range<usize>,
    pub strategy: MatchStrategy,
}

impl MappedRange {
    pub fn start(&self) -> usize {
        self.range.start
    }

    pub fn end(&self) -> usize {
        self.range.end
    }

    /// True when the range came from a mapped match rather than a heuristic guess.
    pub fn is_precise(&self) -> bool {
        self.strategy <= MatchStrategy::WhitespaceNormalized
    }
}

/// Maps a rendered (marker-stripped) selection back to byte offsets in the
/// block's Markdown source.
///
/// Tries, in order: the exact mapped match, the whitespace-normalized mapped
/// match, a raw substring search, a search for the first word, and finally
/// offset 0. Always returns `start <= end <= block_content.len()` with both
/// offsets on char boundaries.
pub fn compute_offsets(block_content: &str, rendered: &str) -> MappedRange {
    let stripped = strip_emphasis(block_content);

    if let Some(range) = find_mapped(&stripped, rendered, block_content) {
        return MappedRange {
            range,
            strategy: MatchStrategy::Exact,
        };
    }

    let normalized_rendered = collapse_whitespace(rendered);
    if let Some(range) =
        find_mapped(&stripped.collapse_whitespace(), &normalized_rendered, block_content)
    {
        return MappedRange {
            range,
            strategy: MatchStrategy::WhitespaceNormalized,
        };
    }

    let (start, strategy) = if let Some(start) = block_content.find(rendered) {
        (start, MatchStrategy::RawSubstring)
    } else if let Some(start) = rendered
        .split_whitespace()
        .next()
        .and_then(|word| block_content.find(word))
    {
        (start, MatchStrategy::FirstWord)
    } else {
        (0, MatchStrategy::Fallback)
    };

    log::debug!(
        "selection {:?} mapped via {:?} at {}",
        preview(rendered),
        strategy,
        start
    );

    let end = floor_char_boundary(block_content, start + rendered.len()).max(start);
    MappedRange {
        range: start..end,
        strategy,
    }
}

/// Collapses every run of whitespace to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    let re =
        WHITESPACE_RUN.get_or_init(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));
    re.replace_all(s, " ").into_owned()
}

fn find_mapped(stripped: &StrippedText, needle: &str, source: &str) -> Option<Range<usize>> {
    let s = stripped.text.find(needle)?;
    let range = stripped.source_range(s..s + needle.len());
    // A collapsed run maps to the first byte of a possibly multi-byte space.
    Some(range.start..ceil_char_boundary(source, range.end))
}

/// Largest char boundary in `s` that is `<= index`, clamped to `s.len()`.
pub(crate) fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut i = index;
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

/// Smallest char boundary in `s` that is `>= index`, clamped to `s.len()`.
fn ceil_char_boundary(s: &str, index: usize) -> usize {
    let mut i = index.min(s.len());
    while !s.is_char_boundary(i) {
        i += 1;
    }
    i
}

fn preview(s: &str) -> String {
    s.chars().take(40).collect()
}

/// Converts a UTF-16 code unit offset (as reported by browser selections)
/// into a byte offset into `s`. Offsets past the end clamp to `s.len()`;
/// offsets inside a surrogate pair round down to the char start.
pub fn utf16_to_byte(s: &str, utf16_offset: usize) -> usize {
    let mut units = 0;
    for (byte_idx, c) in s.char_indices() {
        let next = units + c.len_utf16();
        if next > utf16_offset {
            return byte_idx;
        }
        units = next;
    }
    s.len()
}

/// Converts a byte offset into `s` to a UTF-16 code unit offset.
pub fn byte_to_utf16(s: &str, byte_offset: usize) -> usize {
    let end = floor_char_boundary(s, byte_offset);
    s[..end].chars().map(char::len_utf16).sum()
}
