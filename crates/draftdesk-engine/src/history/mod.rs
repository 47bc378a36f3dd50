//! # Version Engine
//!
//! Append-only, branch-free history of document snapshots for one document.
//!
//! - **`snapshot`**: `Snapshot` value type, `SnapshotId`, content `Fingerprint`
//! - **`commands`**: `VersionCommand` enum and the `HistoryPatch` it produces
//! - **`state`**: `VersionHistory` state machine and the pure `transition()`
//!
//! ## Rules
//!
//! - A new major version drops every snapshot after the cursor first (no branches).
//! - Minor edits rewrite the current snapshot in place and never move the cursor.
//! - After any append, the oldest snapshots are evicted down to the cap and
//!   the cursor shifts with them (never below 0).
//! - `switch_to_version` addresses snapshots by sequence index, because
//!   eviction shifts array positions.

pub mod commands;
pub mod snapshot;
pub mod state;

pub use commands::{HistoryPatch, VersionCommand};
pub use snapshot::{Fingerprint, Snapshot, SnapshotId};
pub use state::{VersionHistory, transition};
