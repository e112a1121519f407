//! Immutable version snapshots

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::connection::parse_timestamp;
use crate::db::Database;
use crate::store::ProjectFile;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileVersion {
    pub id: String,
    pub project_id: String,
    pub version_number: i64,
    pub files: Vec<ProjectFile>,
    pub preview_html: Option<String>,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Version listing without the file payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionSummary {
    pub version_number: i64,
    pub file_count: usize,
    pub label: Option<String>,
    pub created_at: DateTime<Utc>,
}

pub struct VersionRepository {
    db: Database,
}

impl VersionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Store a snapshot under the project's next version number.
    ///
    /// Numbering and insert share one transaction, so numbers stay gapless
    /// and strictly increasing.
    pub async fn create(
        &self,
        project_id: &str,
        files: &[ProjectFile],
        preview_html: Option<&str>,
        label: Option<&str>,
    ) -> Result<FileVersion> {
        let files_json = serde_json::to_string(files).context("Failed to serialize version files")?;
        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let mut conn = self.db.lock().await;
        let tx = conn.transaction().context("Failed to begin version transaction")?;

        let version_number: i64 = tx.query_row(
            "SELECT COALESCE(MAX(version_number), 0) + 1 FROM file_versions WHERE project_id = ?1",
            params![project_id],
            |row| row.get(0),
        )?;

        tx.execute(
            "INSERT INTO file_versions (id, project_id, version_number, files, preview_html, label, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                id,
                project_id,
                version_number,
                files_json,
                preview_html,
                label,
                now.to_rfc3339(),
            ],
        ).context("Failed to insert version")?;
        tx.commit().context("Failed to commit version")?;

        tracing::debug!("Created version {} for project {}", version_number, project_id);
        Ok(FileVersion {
            id,
            project_id: project_id.to_string(),
            version_number,
            files: files.to_vec(),
            preview_html: preview_html.map(str::to_string),
            label: label.map(str::to_string),
            created_at: now,
        })
    }

    pub async fn get(&self, project_id: &str, version_number: i64) -> Result<Option<FileVersion>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, version_number, files, preview_html, label, created_at
             FROM file_versions WHERE project_id = ?1 AND version_number = ?2"
        )?;

        let row = stmt
            .query_row(params![project_id, version_number], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, Option<String>>(4)?,
                    row.get::<_, Option<String>>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })
            .optional()
            .context("Failed to get version")?;

        let Some((id, project_id, version_number, files, preview_html, label, created_at)) = row else {
            return Ok(None);
        };

        let files: Vec<ProjectFile> = serde_json::from_str(&files)
            .with_context(|| format!("Corrupt file list in version {}", version_number))?;

        Ok(Some(FileVersion {
            id,
            project_id,
            version_number,
            files,
            preview_html,
            label,
            created_at: parse_timestamp(&created_at),
        }))
    }

    /// Versions of a project, newest first
    pub async fn list(&self, project_id: &str) -> Result<Vec<VersionSummary>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT version_number, json_array_length(files), label, created_at
             FROM file_versions WHERE project_id = ?1 ORDER BY version_number DESC"
        )?;

        let versions = stmt
            .query_map(params![project_id], |row| {
                Ok(VersionSummary {
                    version_number: row.get(0)?,
                    file_count: row.get::<_, i64>(1)?.max(0) as usize,
                    label: row.get(2)?,
                    created_at: parse_timestamp(&row.get::<_, String>(3)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect versions")?;

        Ok(versions)
    }

    pub async fn latest_number(&self, project_id: &str) -> Result<Option<i64>> {
        let conn = self.db.lock().await;
        let latest = conn.query_row(
            "SELECT MAX(version_number) FROM file_versions WHERE project_id = ?1",
            params![project_id],
            |row| row.get::<_, Option<i64>>(0),
        )?;
        Ok(latest)
    }
}
