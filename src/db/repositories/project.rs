//! Project repository

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::connection::parse_timestamp;
use crate::db::Database;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub workspace_id: String,
    pub name: String,
    pub description: Option<String>,
    /// Most recently compiled preview document
    pub preview_html: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct ProjectRepository {
    db: Database,
}

impl ProjectRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Create a new project. A fresh workspace id is minted when none is given.
    pub async fn create(
        &self,
        name: String,
        workspace_id: Option<String>,
        description: Option<String>,
    ) -> Result<Project> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        let project = Project {
            id: id.clone(),
            workspace_id: workspace_id.unwrap_or_else(|| Uuid::new_v4().to_string()),
            name,
            description,
            preview_html: None,
            created_at: now,
            updated_at: now,
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO projects (id, workspace_id, name, description, preview_html, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                project.id,
                project.workspace_id,
                project.name,
                project.description,
                project.preview_html,
                project.created_at.to_rfc3339(),
                project.updated_at.to_rfc3339(),
            ],
        ).context("Failed to insert project")?;

        tracing::debug!("Created project: {}", id);
        Ok(project)
    }

    /// Get a project by ID
    pub async fn get(&self, id: &str) -> Result<Option<Project>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, name, description, preview_html, created_at, updated_at
             FROM projects WHERE id = ?1"
        )?;

        match stmt.query_row(params![id], Self::map_row) {
            Ok(project) => Ok(Some(project)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to get project"),
        }
    }

    /// List all projects
    pub async fn list(&self) -> Result<Vec<Project>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, name, description, preview_html, created_at, updated_at
             FROM projects ORDER BY created_at DESC"
        )?;

        let projects = stmt
            .query_map([], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(projects)
    }

    /// Cache the latest compiled preview on the project
    pub async fn set_preview_html(&self, id: &str, preview_html: &str) -> Result<()> {
        let conn = self.db.lock().await;
        let updated = conn.execute(
            "UPDATE projects SET preview_html = ?1, updated_at = ?2 WHERE id = ?3",
            params![preview_html, Utc::now().to_rfc3339(), id],
        ).context("Failed to update project preview")?;

        if updated == 0 {
            anyhow::bail!("Project not found: {}", id);
        }
        Ok(())
    }

    /// Delete a project
    pub async fn delete(&self, id: &str) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
        tracing::debug!("Deleted project: {}", id);
        Ok(())
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Project> {
        Ok(Project {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            preview_html: row.get(4)?,
            created_at: parse_timestamp(&row.get::<_, String>(5)?),
            updated_at: parse_timestamp(&row.get::<_, String>(6)?),
        })
    }
}
