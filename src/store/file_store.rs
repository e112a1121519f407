//! In-memory project file store
//!
//! The store is the single source of truth for "current" file content. It is
//! a cheap-to-clone handle: the session controller, the reconciler and any UI
//! reader share one instance. Every mutation takes the write lock, applies the
//! change, recomputes the tree and bumps the revision before returning, so two
//! back-to-back dispatches can never interleave partially.

use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::language::Language;
use super::patch::{apply_patches, FilePatch};
use super::tree::{build_tree, TreeNode};

/// A file held by the store
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProjectFile {
    pub path: String,
    pub content: String,
    pub language: Language,
}

impl ProjectFile {
    pub fn new(path: impl Into<String>, content: impl Into<String>) -> Self {
        let path = normalize_path(&path.into());
        Self {
            language: Language::from_path(&path),
            path,
            content: content.into(),
        }
    }
}

/// Outcome of `FileStore::patch_file`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Applied { applied: usize, skipped: usize },
    Missing,
}

#[derive(Debug, Default)]
struct StoreState {
    files: BTreeMap<String, ProjectFile>,
    tree: Vec<TreeNode>,
    selected: Option<String>,
    preview_html: Option<String>,
}

impl StoreState {
    fn rebuild_tree(&mut self) {
        self.tree = build_tree(self.files.keys().map(String::as_str));
    }

    fn upsert(&mut self, path: String, content: String) -> bool {
        match self.files.get_mut(&path) {
            Some(existing) => {
                existing.content = content;
                false
            }
            None => {
                let file = ProjectFile {
                    language: Language::from_path(&path),
                    path: path.clone(),
                    content,
                };
                self.files.insert(path, file);
                self.rebuild_tree();
                true
            }
        }
    }
}

/// Shared handle to the project's in-memory files
#[derive(Clone)]
pub struct FileStore {
    state: Arc<RwLock<StoreState>>,
    revision: Arc<watch::Sender<u64>>,
}

impl Default for FileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FileStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            revision: Arc::new(tx),
        }
    }

    // A poisoned lock still holds consistent state: every mutation finishes
    // its critical section without panicking paths in between.
    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(|e| e.into_inner())
    }

    fn notify(&self) {
        self.revision.send_modify(|rev| *rev += 1);
    }

    /// Create or fully overwrite a file
    pub fn add_file(&self, path: &str, content: impl Into<String>) {
        let path = normalize_path(path);
        if path.is_empty() {
            warn!("Ignoring file with empty path");
            return;
        }
        let created = self.write().upsert(path.clone(), content.into());
        debug!("{} {}", if created { "Created" } else { "Overwrote" }, path);
        self.notify();
    }

    /// Replace a file's content, creating it when absent
    pub fn update_file(&self, path: &str, content: impl Into<String>) {
        self.add_file(path, content);
    }

    /// Apply partial edits to an existing file.
    ///
    /// Patches cannot materialize a file: a missing path is a logged no-op.
    pub fn patch_file(&self, path: &str, patches: &[FilePatch]) -> PatchOutcome {
        let path = normalize_path(path);
        let outcome = {
            let mut state = self.write();
            match state.files.get_mut(&path) {
                Some(file) => {
                    let result = apply_patches(&path, &file.content, patches);
                    file.content = result.content;
                    PatchOutcome::Applied {
                        applied: result.applied,
                        skipped: result.skipped,
                    }
                }
                None => PatchOutcome::Missing,
            }
        };

        match outcome {
            PatchOutcome::Applied { applied, skipped } => {
                debug!("Patched {} ({} applied, {} skipped)", path, applied, skipped);
                self.notify();
            }
            PatchOutcome::Missing => {
                warn!("Ignoring patch for missing file: {}", path);
            }
        }
        outcome
    }

    /// Delete a file; returns false when it did not exist
    pub fn remove_file(&self, path: &str) -> bool {
        let path = normalize_path(path);
        let removed = {
            let mut state = self.write();
            let removed = state.files.remove(&path).is_some();
            if removed {
                state.rebuild_tree();
            }
            removed
        };
        if removed {
            debug!("Removed {}", path);
            self.notify();
        }
        removed
    }

    pub fn get_file(&self, path: &str) -> Option<ProjectFile> {
        self.read().files.get(&normalize_path(path)).cloned()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.read().files.contains_key(&normalize_path(path))
    }

    /// Point-in-time snapshot of every file, ordered by path
    pub fn files(&self) -> Vec<ProjectFile> {
        self.read().files.values().cloned().collect()
    }

    /// Snapshot of the given paths that still exist, in the given order
    pub fn files_at<S: AsRef<str>>(&self, paths: &[S]) -> Vec<ProjectFile> {
        let state = self.read();
        paths
            .iter()
            .filter_map(|p| state.files.get(&normalize_path(p.as_ref())).cloned())
            .collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.read().files.keys().cloned().collect()
    }

    pub fn tree(&self) -> Vec<TreeNode> {
        self.read().tree.clone()
    }

    pub fn len(&self) -> usize {
        self.read().files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().files.is_empty()
    }

    pub fn set_selected_file(&self, path: Option<&str>) {
        self.write().selected = path.map(normalize_path);
        self.notify();
    }

    pub fn selected_path(&self) -> Option<String> {
        self.read().selected.clone()
    }

    /// The focused file, if it is still present
    pub fn selected_file(&self) -> Option<ProjectFile> {
        let state = self.read();
        state
            .selected
            .as_ref()
            .and_then(|p| state.files.get(p))
            .cloned()
    }

    pub fn set_preview_html(&self, html: impl Into<String>) {
        self.write().preview_html = Some(html.into());
        self.notify();
    }

    /// Set or clear the cached preview
    pub fn replace_preview_html(&self, html: Option<String>) {
        self.write().preview_html = html;
        self.notify();
    }

    pub fn preview_html(&self) -> Option<String> {
        self.read().preview_html.clone()
    }

    /// Reset everything: files, tree, selection and preview
    pub fn clear_files(&self) {
        *self.write() = StoreState::default();
        debug!("Cleared file store");
        self.notify();
    }

    /// Clear and repopulate in a single critical section
    pub fn replace_all<I>(&self, files: I)
    where
        I: IntoIterator<Item = ProjectFile>,
    {
        {
            let mut state = self.write();
            state.files.clear();
            for file in files {
                let path = normalize_path(&file.path);
                if path.is_empty() {
                    continue;
                }
                state.files.insert(
                    path.clone(),
                    ProjectFile {
                        language: Language::from_path(&path),
                        path,
                        content: file.content,
                    },
                );
            }
            state.selected = None;
            state.rebuild_tree();
        }
        self.notify();
    }

    /// Monotonic counter bumped after every applied mutation
    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }
}

/// Normalize to a POSIX-style relative path: no leading `./` or `/`,
/// no empty segments, no `.` segments.
pub fn normalize_path(path: &str) -> String {
    path.trim()
        .replace('\\', "/")
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .collect::<Vec<_>>()
        .join("/")
}
