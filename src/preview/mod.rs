//! Live preview compilation

pub mod compiler;
pub mod document;
pub mod extract;
pub mod router;
pub mod transform;

pub use compiler::{PreviewCompiler, PreviewOptions, DEFAULT_TAILWIND_CDN};
pub use document::PLACEHOLDER_MESSAGE;
pub use extract::{extract_markup, Extraction};
pub use router::select_entry;
pub use transform::transform_markup;
