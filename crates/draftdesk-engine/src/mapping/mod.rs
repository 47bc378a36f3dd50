//! # Position Mapping
//!
//! Maps a selection made on rendered text back to byte offsets in the block's
//! Markdown source, so an edit can be applied as an exact substring splice.
//!
//! ## Modules
//!
//! - **`cursor`**: `Cursor` for char-by-char scanning with byte positions
//! - **`strip`**: `strip_emphasis()` removes `**`, `__`, `*`, `_` and backtick
//!   delimiters and records where each kept byte came from
//! - **`locate`**: `compute_offsets()` with its degrade-gracefully chain
//!
//! ## Fallback Order
//!
//! Exact mapped match, then whitespace-normalized mapped match, then raw
//! substring, then first word, then offset 0. Mapping never fails; callers
//! can inspect [`MatchStrategy`] to see how precise the result is.
//!
//! The emphasis heuristic must strip exactly what the rendering layer hides;
//! offsets are only valid while the two agree.

pub mod cursor;
pub mod locate;
pub mod strip;

pub use locate::{
    MappedRange, MatchStrategy, byte_to_utf16, collapse_whitespace, compute_offsets,
    utf16_to_byte,
};
pub use strip::{MarkerPair, StrippedText, strip_emphasis};
