pub mod blocks;
pub mod collaborators;
pub mod edit;
pub mod history;
pub mod mapping;
pub mod selection;
pub mod session;
pub mod store;

// Re-export key types for easier usage
pub use blocks::{Block, BlockId, BlockKind, BlockList, Metadata, split_paragraphs};
pub use collaborators::{CollaboratorError, Generator, PromptContext, TextEditor};
pub use edit::{AppliedEdit, EditOutcome, apply_edit, splice_selection};
pub use history::*;
pub use mapping::{MappedRange, MatchStrategy, compute_offsets};
pub use selection::{Selection, SelectionController};
pub use session::{Commit, DocumentSession, SessionError, SessionOptions, SharedSession};
pub use store::{DocumentId, FileStore, MemoryStore, SnapshotStore, StoreError};
