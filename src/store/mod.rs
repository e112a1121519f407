//! In-memory file store and its derived views

pub mod file_store;
pub mod language;
pub mod patch;
pub mod tree;

pub use file_store::{normalize_path, FileStore, PatchOutcome, ProjectFile};
pub use language::{FileType, Language};
pub use patch::FilePatch;
pub use tree::{NodeKind, TreeNode};
