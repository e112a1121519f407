//! Partial edits carried by `PATCH_FILE` events
//!
//! Patches are applied best-effort: each one runs against the output of the
//! previous one, and a patch whose target no longer matches is skipped
//! without discarding the others.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// A single partial edit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum FilePatch {
    /// Replace the first occurrence of `search` with `replace`
    Replace { search: String, replace: String },
    /// Replace 1-based inclusive lines `start_line..=end_line` with `content`
    Lines {
        #[serde(rename = "startLine")]
        start_line: usize,
        #[serde(rename = "endLine")]
        end_line: usize,
        content: String,
    },
}

/// Result of applying a patch sequence to existing content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchResult {
    pub content: String,
    pub applied: usize,
    pub skipped: usize,
}

impl FilePatch {
    /// Apply this patch, returning `None` when the target does not match
    pub fn apply(&self, content: &str) -> Option<String> {
        match self {
            FilePatch::Replace { search, replace } => {
                if search.is_empty() {
                    return None;
                }
                content
                    .find(search.as_str())
                    .map(|_| content.replacen(search.as_str(), replace, 1))
            }
            FilePatch::Lines {
                start_line,
                end_line,
                content: replacement,
            } => replace_lines(content, *start_line, *end_line, replacement),
        }
    }
}

/// Apply patches in order, skipping the ones that no longer match
pub fn apply_patches(path: &str, content: &str, patches: &[FilePatch]) -> PatchResult {
    let mut current = content.to_string();
    let mut applied = 0;
    let mut skipped = 0;

    for (index, patch) in patches.iter().enumerate() {
        match patch.apply(&current) {
            Some(next) => {
                current = next;
                applied += 1;
            }
            None => {
                warn!("Skipping patch {} for {}: target does not match", index, path);
                skipped += 1;
            }
        }
    }

    PatchResult {
        content: current,
        applied,
        skipped,
    }
}

fn replace_lines(content: &str, start: usize, end: usize, replacement: &str) -> Option<String> {
    let lines: Vec<&str> = content.split('\n').collect();
    if start == 0 || end < start || end > lines.len() {
        return None;
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start - 1]);
    // An empty replacement deletes the range outright.
    if !replacement.is_empty() {
        out.extend(replacement.split('\n'));
    }
    out.extend_from_slice(&lines[end..]);
    Some(out.join("\n"))
}
