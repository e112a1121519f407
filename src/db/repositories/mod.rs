//! Table repositories

pub mod file;
pub mod message;
pub mod project;
pub mod session;
pub mod version;

pub use file::{content_hash, FileRecord, FileRepository, UpsertSummary};
pub use message::{ChatMessage, MessageRepository};
pub use project::{Project, ProjectRepository};
pub use session::SessionRepository;
pub use version::{FileVersion, VersionRepository, VersionSummary};
