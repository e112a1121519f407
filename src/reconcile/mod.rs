//! Persistence reconciler
//!
//! Moves state between the live `FileStore` and the database: saving what a
//! session touched, snapshotting versions, restoring them, and loading a
//! project's saved files. Reads from the store are point-in-time snapshots;
//! nothing here holds the store across an await.

mod error;

pub use error::ReconcileError;

use tracing::{debug, info, warn};

use crate::db::repositories::UpsertSummary;
use crate::db::{Database, FileRepository, FileVersion, Project, ProjectRepository, VersionRepository};
use crate::preview::PreviewCompiler;
use crate::session::SessionDelta;
use crate::store::{FileStore, ProjectFile};

/// Result of persisting one session's writes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: UpsertSummary,
    /// Paths in the delta that were no longer in the store at save time
    pub missing: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct RestoreReport {
    pub version_number: i64,
    pub file_count: usize,
    pub backup: Option<i64>,
}

pub struct PersistenceReconciler {
    store: FileStore,
    files: FileRepository,
    versions: VersionRepository,
    projects: ProjectRepository,
    /// Rebuilds the preview for versions stored without one
    compiler: PreviewCompiler,
    preview_route: String,
}

impl PersistenceReconciler {
    pub fn new(
        db: Database,
        store: FileStore,
        compiler: PreviewCompiler,
        preview_route: impl Into<String>,
    ) -> Self {
        Self {
            store,
            files: FileRepository::new(db.clone()),
            versions: VersionRepository::new(db.clone()),
            projects: ProjectRepository::new(db),
            compiler,
            preview_route: preview_route.into(),
        }
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    pub fn versions(&self) -> &VersionRepository {
        &self.versions
    }

    /// Persist the files a session wrote or deleted.
    ///
    /// Safe to call again after a failure: unchanged content is a no-op.
    pub async fn save_session_files(
        &self,
        project: &Project,
        delta: &SessionDelta,
    ) -> Result<SaveReport, ReconcileError> {
        let files = self.store.files_at(&delta.written);
        let missing: Vec<String> = delta
            .written
            .iter()
            .filter(|p| !files.iter().any(|f| &f.path == *p))
            .cloned()
            .collect();
        if !missing.is_empty() {
            debug!("{} written paths no longer in store: {:?}", missing.len(), missing);
        }

        let saved = self
            .files
            .save(&project.workspace_id, &project.id, &files, &delta.deleted)
            .await
            .map_err(ReconcileError::Save)?;

        info!(
            "Saved session files for project {}: {} inserted, {} updated, {} unchanged, {} deleted",
            project.id, saved.inserted, saved.updated, saved.unchanged, saved.deleted
        );
        Ok(SaveReport { saved, missing })
    }

    /// Record a version. Failures are logged and swallowed.
    pub async fn create_version(
        &self,
        project_id: &str,
        files: &[ProjectFile],
        preview_html: Option<&str>,
        label: Option<&str>,
    ) -> Option<FileVersion> {
        match self.versions.create(project_id, files, preview_html, label).await {
            Ok(version) => {
                info!(
                    "Created version {} for project {} ({} files)",
                    version.version_number,
                    project_id,
                    version.files.len()
                );
                Some(version)
            }
            Err(e) => {
                warn!("Failed to create version for project {}: {:#}", project_id, e);
                None
            }
        }
    }

    /// Version of whatever the live store holds right now
    pub async fn snapshot_current(&self, project_id: &str, label: Option<&str>) -> Option<FileVersion> {
        let files = self.store.files();
        let preview = self.store.preview_html();
        self.create_version(project_id, &files, preview.as_deref(), label)
            .await
    }

    /// Make version `version_number` the live and saved state of the project.
    ///
    /// On any persistence failure the live store is put back as it was.
    pub async fn restore_version(
        &self,
        project: &Project,
        version_number: i64,
        backup: bool,
    ) -> Result<RestoreReport, ReconcileError> {
        let restore_err = |source: anyhow::Error| ReconcileError::Restore {
            version: version_number,
            source,
        };

        let target = self
            .versions
            .get(&project.id, version_number)
            .await
            .map_err(restore_err)?
            .ok_or_else(|| ReconcileError::VersionNotFound {
                project_id: project.id.clone(),
                version: version_number,
            })?;

        let backup = if backup {
            let label = format!("Backup before restoring v{}", version_number);
            self.snapshot_current(&project.id, Some(&label))
                .await
                .map(|v| v.version_number)
        } else {
            None
        };

        let previous_files = self.store.files();
        let previous_preview = self.store.preview_html();

        let preview = match &target.preview_html {
            Some(html) => html.clone(),
            None => self
                .compiler
                .compile_project(&target.files, &self.preview_route),
        };
        self.store.replace_all(target.files.iter().cloned());
        self.store.replace_preview_html(Some(preview.clone()));

        if let Err(e) = self.persist_restore(project, &target, &preview, &previous_files).await {
            warn!(
                "Restore of version {} failed, rolling back live files: {:#}",
                version_number, e
            );
            self.store.replace_all(previous_files);
            self.store.replace_preview_html(previous_preview);
            return Err(restore_err(e));
        }

        info!(
            "Restored project {} to version {} ({} files)",
            project.id,
            version_number,
            target.files.len()
        );
        Ok(RestoreReport {
            version_number,
            file_count: target.files.len(),
            backup,
        })
    }

    async fn persist_restore(
        &self,
        project: &Project,
        target: &FileVersion,
        preview: &str,
        previous_files: &[ProjectFile],
    ) -> anyhow::Result<()> {
        self.files
            .replace_all(&project.workspace_id, &project.id, &target.files)
            .await?;

        if let Err(e) = self.projects.set_preview_html(&project.id, preview).await {
            // files already committed; put the saved set back before failing
            if let Err(undo) = self
                .files
                .replace_all(&project.workspace_id, &project.id, previous_files)
                .await
            {
                warn!("Failed to roll back saved files for project {}: {:#}", project.id, undo);
            }
            return Err(e);
        }
        Ok(())
    }

    /// Reset the store to the project's saved files
    pub async fn load_project(&self, project: &Project) -> Result<usize, ReconcileError> {
        self.store.clear_files();

        let records = self
            .files
            .list(&project.workspace_id)
            .await
            .map_err(ReconcileError::Load)?;
        let count = records.len();
        self.store
            .replace_all(records.iter().map(|r| r.to_project_file()));
        if let Some(html) = &project.preview_html {
            self.store.set_preview_html(html.clone());
        }

        info!("Loaded {} files for project {}", count, project.id);
        Ok(count)
    }
}
