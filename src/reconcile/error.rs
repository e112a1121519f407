use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("failed to save generated files: {0:#}")]
    Save(anyhow::Error),

    #[error("version {version} not found for project {project_id}")]
    VersionNotFound { project_id: String, version: i64 },

    #[error("failed to restore version {version}: {source:#}")]
    Restore {
        version: i64,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to load project files: {0:#}")]
    Load(anyhow::Error),
}
