//! Application state
//!
//! `Workbench` wires one live file store to the controller, the reconciler and
//! the repositories, and runs the end-to-end flows the CLI exposes.

use std::sync::Arc;

use anyhow::Context;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::db::{
    Database, FileVersion, MessageRepository, Project, ProjectRepository, SessionRepository,
};
use crate::preview::PreviewCompiler;
use crate::reconcile::{PersistenceReconciler, ReconcileError, RestoreReport, SaveReport};
use crate::session::{
    CompletedGeneration, ControllerOptions, GenerationController, GenerationError,
    GenerationProvider, GenerationRequest, GenerationSession, HttpGenerationProvider,
    SessionOutcome,
};
use crate::store::FileStore;

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

#[derive(Debug)]
pub enum RunOutcome {
    Completed {
        generation: CompletedGeneration,
        saved: SaveReport,
        version: Option<FileVersion>,
    },
    Cancelled,
}

#[derive(Debug)]
pub struct GenerationReport {
    pub session: GenerationSession,
    pub outcome: RunOutcome,
}

pub struct Workbench {
    pub db: Database,
    pub store: FileStore,
    pub controller: Arc<GenerationController>,
    pub reconciler: PersistenceReconciler,
    pub projects: ProjectRepository,
    pub sessions: SessionRepository,
    pub messages: MessageRepository,
    history_limit: usize,
}

impl Workbench {
    pub fn new(
        db: Database,
        provider: Arc<dyn GenerationProvider>,
        compiler: PreviewCompiler,
        options: ControllerOptions,
        history_limit: usize,
    ) -> Self {
        let store = FileStore::new();
        let reconciler = PersistenceReconciler::new(
            db.clone(),
            store.clone(),
            compiler.clone(),
            options.preview_route.clone(),
        );
        Self {
            controller: Arc::new(GenerationController::new(
                provider,
                store.clone(),
                compiler,
                options,
            )),
            reconciler,
            projects: ProjectRepository::new(db.clone()),
            sessions: SessionRepository::new(db.clone()),
            messages: MessageRepository::new(db.clone()),
            store,
            db,
            history_limit,
        }
    }

    /// Wire everything against the HTTP provider named in `config`
    pub fn from_config(db: Database, config: &Config) -> Self {
        let provider = HttpGenerationProvider::new(config.api_url.clone(), config.connect_timeout());
        let options = ControllerOptions {
            preview_interval: config.preview.interval(),
            preview_route: config.preview.default_route.clone(),
        };
        Self::new(
            db,
            Arc::new(provider),
            PreviewCompiler::new(config.preview.options()),
            options,
            config.history_limit,
        )
    }

    /// Load a project into the live store
    pub async fn open_project(&self, project_id: &str) -> anyhow::Result<Project> {
        let project = self
            .projects
            .get(project_id)
            .await?
            .with_context(|| format!("Project not found: {}", project_id))?;

        self.reconciler.load_project(&project).await?;
        Ok(project)
    }

    /// Run one prompt end to end: stream, apply, save, snapshot.
    ///
    /// Sessions left unfinished by an earlier process are closed before the
    /// new one is recorded.
    pub async fn run_generation(
        &self,
        project: &Project,
        prompt: &str,
        credential: Option<&str>,
    ) -> Result<GenerationReport, RunError> {
        let mut request = GenerationRequest::new(&project.id, &project.workspace_id, prompt);
        GenerationController::check_preconditions(&request, credential)?;

        if !self.controller.is_live() {
            let orphaned = self.sessions.fail_orphaned(&project.id).await?;
            if orphaned > 0 {
                warn!("Closed {} interrupted sessions for project {}", orphaned, project.id);
            }
        }

        let mut session = GenerationSession::new(&project.id, prompt);
        self.sessions.create(&session).await?;

        let history = self.messages.history(&project.id, self.history_limit).await?;
        self.messages.append(&project.id, "user", prompt).await?;
        request = request
            .with_history(history)
            .with_files(&self.store.files());

        let result = self
            .controller
            .generate(request, credential, &mut session)
            .await;
        self.sessions.update(&session).await?;

        let generation = match result? {
            SessionOutcome::Completed(generation) => generation,
            SessionOutcome::Cancelled => {
                return Ok(GenerationReport {
                    session,
                    outcome: RunOutcome::Cancelled,
                })
            }
        };

        let saved = self
            .reconciler
            .save_session_files(project, &generation.delta)
            .await?;

        let label = truncate_label(prompt);
        let version = self
            .reconciler
            .create_version(
                &project.id,
                &self.store.files(),
                Some(&generation.preview_html),
                Some(&label),
            )
            .await;

        self.projects
            .set_preview_html(&project.id, &generation.preview_html)
            .await?;

        let reply = generation
            .summary
            .ai_message
            .clone()
            .unwrap_or_else(|| format!("Generated {} files", session.files_generated));
        self.messages.append(&project.id, "assistant", &reply).await?;

        info!(
            "Session {} finished: {} files, version {:?}",
            session.id,
            session.files_generated,
            version.as_ref().map(|v| v.version_number)
        );
        Ok(GenerationReport {
            session,
            outcome: RunOutcome::Completed {
                generation,
                saved,
                version,
            },
        })
    }

    /// Roll the project back to a stored version
    pub async fn restore(
        &self,
        project: &Project,
        version_number: i64,
        backup: bool,
    ) -> Result<RestoreReport, ReconcileError> {
        if self.controller.cancel_and_wait().await {
            info!("Cancelled live generation before restore");
        }
        self.reconciler
            .restore_version(project, version_number, backup)
            .await
    }

    /// Compile the live store for `route`
    pub fn preview(&self, route: &str) -> String {
        self.controller
            .compiler()
            .compile_project(&self.store.files(), route)
    }
}

fn truncate_label(prompt: &str) -> String {
    const MAX: usize = 60;
    let prompt = prompt.trim();
    if prompt.chars().count() <= MAX {
        return prompt.to_string();
    }
    let cut: String = prompt.chars().take(MAX).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_prompts_are_shortened_for_labels() {
        assert_eq!(truncate_label("  add a navbar "), "add a navbar");
        let long = "x".repeat(80);
        let label = truncate_label(&long);
        assert_eq!(label.len(), 63);
        assert!(label.ends_with("..."));
    }
}
