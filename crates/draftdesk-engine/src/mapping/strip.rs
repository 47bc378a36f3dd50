use std::ops::Range;

use super::cursor::Cursor;

/// Double emphasis delimiters, always skipped as a two-character unit.
pub const DOUBLE_MARKERS: [&str; 2] = ["**", "__"];
/// Single emphasis delimiters, skipped only when they look like inline emphasis.
pub const SINGLE_MARKERS: [char; 2] = ['*', '_'];
/// Inline code delimiter, skipped unconditionally.
pub const CODE_TICK: char = '`';

/// Source byte ranges of a matched single `*` or `_` opener and its closer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerPair {
    pub open: Range<usize>,
    pub close: Range<usize>,
}

/// Block source with emphasis markers removed, plus the index correspondence
/// back into the source.
///
/// `map[k]` is the byte offset in the source of the byte that became `text[k]`.
/// Multi-byte characters contribute one entry per byte, so any char-boundary
/// index into `text` can be looked up directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrippedText {
    pub text: String,
    pub map: Vec<usize>,
    /// Single-marker pairs that were stripped, in closing order.
    pub pairs: Vec<MarkerPair>,
    /// Byte length of the source this was built from.
    pub source_len: usize,
}

impl StrippedText {
    /// Maps a byte range of `text` back to a byte range of the source.
    ///
    /// The end lands one past the last source byte of the range, so closing
    /// markers that directly follow the selection stay outside it. The one
    /// exception is a single-marker closer whose opener lies inside the range:
    /// it is taken in, and symmetrically an opener directly before the range
    /// is taken in when its closer lies inside. Without its partner a lone
    /// `*` or `_` would read as a literal character.
    pub fn source_range(&self, range: Range<usize>) -> Range<usize> {
        let start = self.map.get(range.start).copied().unwrap_or(self.source_len);
        if range.end <= range.start {
            return start..start;
        }
        let end = self
            .map
            .get(range.end - 1)
            .map(|&last| last + 1)
            .unwrap_or(self.source_len)
            .max(start);
        self.balance(start..end)
    }

    fn balance(&self, mut range: Range<usize>) -> Range<usize> {
        let contains = |r: &Range<usize>, m: &Range<usize>| m.start >= r.start && m.end <= r.end;
        let mut changed = true;
        while changed {
            changed = false;
            for pair in &self.pairs {
                if pair.close.start == range.end && contains(&range, &pair.open) {
                    range.end = pair.close.end;
                    changed = true;
                }
                if pair.open.end == range.start && contains(&range, &pair.close) {
                    range.start = pair.open.start;
                    changed = true;
                }
            }
        }
        range
    }

    /// Collapses every run of whitespace to a single space, keeping the map
    /// pointed at the original source.
    pub fn collapse_whitespace(&self) -> StrippedText {
        let mut text = String::with_capacity(self.text.len());
        let mut map = Vec::with_capacity(self.map.len());
        let mut in_run = false;

        for (idx, c) in self.text.char_indices() {
            if c.is_whitespace() {
                if !in_run {
                    text.push(' ');
                    map.push(self.map[idx]);
                    in_run = true;
                }
                continue;
            }
            in_run = false;
            text.push(c);
            map.extend_from_slice(&self.map[idx..idx + c.len_utf8()]);
        }

        StrippedText {
            text,
            map,
            pairs: self.pairs.clone(),
            source_len: self.source_len,
        }
    }
}

/// Strips lightweight inline emphasis markers from a block's Markdown source.
///
/// - `**` and `__` are always dropped as a pair of characters.
/// - A single `*` or `_` is dropped when the next character is not whitespace
///   and the same marker appears again before the next whitespace; that
///   closing marker is dropped too.
/// - Backticks are always dropped.
///
/// Single-marker pairs are recorded in [`StrippedText::pairs`].
/// This mirrors what the rendering layer hides, not full CommonMark.
pub fn strip_emphasis(source: &str) -> StrippedText {
    let mut cur = Cursor::new(source);
    let mut text = String::with_capacity(source.len());
    let mut map = Vec::with_capacity(source.len());
    let mut pairs = Vec::new();
    // (opener position, closer position) of single markers still ahead.
    let mut pending_closers: Vec<(usize, usize)> = Vec::new();

    while let Some(c) = cur.peek() {
        let at = cur.i;

        if let Some(pos) = pending_closers.iter().position(|&(_, close)| close == at) {
            let (open, close) = pending_closers.swap_remove(pos);
            pairs.push(MarkerPair {
                open: open..open + 1,
                close: close..close + 1,
            });
            cur.bump();
            continue;
        }

        if DOUBLE_MARKERS.iter().any(|m| cur.starts_with(m)) {
            cur.bump_n(2);
            continue;
        }

        if c == CODE_TICK {
            cur.bump();
            continue;
        }

        if SINGLE_MARKERS.contains(&c)
            && let Some(close) = find_closing_marker(source, at, c)
        {
            pending_closers.push((at, close));
            cur.bump();
            continue;
        }

        cur.bump();
        text.push(c);
        map.extend((0..c.len_utf8()).map(|j| at + j));
    }

    StrippedText {
        text,
        map,
        pairs,
        source_len: source.len(),
    }
}

/// Looks for the marker closing the single emphasis opened at `open`.
///
/// Returns `None` when the opener is followed by whitespace (or nothing), or
/// when whitespace comes before another `marker`.
fn find_closing_marker(source: &str, open: usize, marker: char) -> Option<usize> {
    let after = open + marker.len_utf8();
    let mut rest = source[after..].char_indices();

    let (_, first) = rest.next()?;
    if first.is_whitespace() || first == marker {
        return None;
    }

    for (offset, c) in rest {
        if c.is_whitespace() {
            return None;
        }
        if c == marker {
            return Some(after + offset);
        }
    }
    None
}
