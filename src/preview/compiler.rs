//! Best-effort component-to-HTML compiler
//!
//! Every entry point returns a complete document. When no markup can be
//! recovered the placeholder document is returned instead, since a broken
//! document would take the whole preview frame down with it.

use tracing::debug;

use super::document::{placeholder_document, render_document};
use super::extract::{extract_markup, Extraction};
use super::router::select_entry;
use super::transform::transform_markup;
use crate::store::language::extension;
use crate::store::ProjectFile;

pub const DEFAULT_TAILWIND_CDN: &str = "https://cdn.tailwindcss.com";

#[derive(Debug, Clone)]
pub struct PreviewOptions {
    pub tailwind_cdn: String,
    pub title: String,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            tailwind_cdn: DEFAULT_TAILWIND_CDN.to_string(),
            title: "Preview".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PreviewCompiler {
    options: PreviewOptions,
}

impl PreviewCompiler {
    pub fn new(options: PreviewOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PreviewOptions {
        &self.options
    }

    /// Extract and rewrite a component's markup; `Unmatched` when nothing
    /// renderable is left.
    pub fn compile_fragment(&self, source: &str) -> Extraction {
        match extract_markup(source) {
            Extraction::Matched(markup) => {
                let html = transform_markup(&markup);
                if html.trim().is_empty() {
                    Extraction::Unmatched
                } else {
                    Extraction::Matched(html)
                }
            }
            Extraction::Unmatched => Extraction::Unmatched,
        }
    }

    /// Compile one component with the given stylesheet text inlined
    pub fn compile_component(&self, source: &str, css: &str) -> String {
        match self.compile_fragment(source) {
            Extraction::Matched(fragment) => render_document(&fragment, css, &self.options),
            Extraction::Unmatched => {
                debug!("No renderable markup found, using placeholder");
                placeholder_document(&self.options)
            }
        }
    }

    /// Compile the file that serves `route`, with every stylesheet inlined
    pub fn compile_project(&self, files: &[ProjectFile], route: &str) -> String {
        let css = collect_css(files);

        match select_entry(files, route) {
            Some(entry) => {
                debug!("Compiling preview for {} from {}", route, entry.path);
                self.compile_component(&entry.content, &css)
            }
            None => match static_html(files) {
                Some(html) => html,
                None => placeholder_document(&self.options),
            },
        }
    }

    pub fn placeholder(&self) -> String {
        placeholder_document(&self.options)
    }
}

/// All `.css` files, in path order
fn collect_css(files: &[ProjectFile]) -> String {
    let mut styles: Vec<&ProjectFile> = files
        .iter()
        .filter(|f| extension(&f.path).as_deref() == Some("css"))
        .collect();
    styles.sort_by(|a, b| a.path.cmp(&b.path));
    styles
        .iter()
        .map(|f| f.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// A hand-written `index.html` is already a document
fn static_html(files: &[ProjectFile]) -> Option<String> {
    files
        .iter()
        .find(|f| f.path == "index.html" || f.path.ends_with("/index.html"))
        .filter(|f| f.content.to_ascii_lowercase().contains("<html"))
        .map(|f| f.content.clone())
}
