//! Saved project files, keyed by workspace and path

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Transaction};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::connection::parse_timestamp;
use crate::db::Database;
use crate::store::{FileType, ProjectFile};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: String,
    pub workspace_id: String,
    pub project_id: String,
    pub file_path: String,
    pub content: String,
    pub file_type: FileType,
    pub content_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FileRecord {
    pub fn to_project_file(&self) -> ProjectFile {
        ProjectFile::new(self.file_path.clone(), self.content.clone())
    }
}

/// Counts from a batch write
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertSummary {
    pub inserted: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

pub fn content_hash(content: &str) -> String {
    hex::encode(Sha256::digest(content.as_bytes()))
}

pub struct FileRepository {
    db: Database,
}

impl FileRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Upsert files and delete paths in one transaction.
    ///
    /// Writing the same content twice leaves the row untouched.
    pub async fn save(
        &self,
        workspace_id: &str,
        project_id: &str,
        files: &[ProjectFile],
        deleted: &[String],
    ) -> Result<UpsertSummary> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction().context("Failed to begin file transaction")?;

        let mut summary = UpsertSummary::default();
        for file in files {
            match upsert(&tx, workspace_id, project_id, file)? {
                Upsert::Inserted => summary.inserted += 1,
                Upsert::Updated => summary.updated += 1,
                Upsert::Unchanged => summary.unchanged += 1,
            }
        }
        for path in deleted {
            summary.deleted += tx.execute(
                "DELETE FROM project_files WHERE workspace_id = ?1 AND file_path = ?2",
                params![workspace_id, path],
            )?;
        }

        tx.commit().context("Failed to commit file transaction")?;
        tracing::debug!(
            "Saved files for workspace {}: {} inserted, {} updated, {} unchanged, {} deleted",
            workspace_id,
            summary.inserted,
            summary.updated,
            summary.unchanged,
            summary.deleted
        );
        Ok(summary)
    }

    /// Make the workspace hold exactly `files`
    pub async fn replace_all(
        &self,
        workspace_id: &str,
        project_id: &str,
        files: &[ProjectFile],
    ) -> Result<UpsertSummary> {
        let mut conn = self.db.lock().await;
        let tx = conn.transaction().context("Failed to begin file transaction")?;

        let mut summary = UpsertSummary::default();
        for file in files {
            match upsert(&tx, workspace_id, project_id, file)? {
                Upsert::Inserted => summary.inserted += 1,
                Upsert::Updated => summary.updated += 1,
                Upsert::Unchanged => summary.unchanged += 1,
            }
        }

        let existing: Vec<String> = {
            let mut stmt = tx.prepare("SELECT file_path FROM project_files WHERE workspace_id = ?1")?;
            let paths = stmt
                .query_map(params![workspace_id], |row| row.get::<_, String>(0))?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            paths
        };
        for path in existing {
            if !files.iter().any(|f| f.path == path) {
                summary.deleted += tx.execute(
                    "DELETE FROM project_files WHERE workspace_id = ?1 AND file_path = ?2",
                    params![workspace_id, path],
                )?;
            }
        }

        tx.commit().context("Failed to commit file transaction")?;
        Ok(summary)
    }

    pub async fn get(&self, workspace_id: &str, file_path: &str) -> Result<Option<FileRecord>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, project_id, file_path, content, file_type, content_hash, created_at, updated_at
             FROM project_files WHERE workspace_id = ?1 AND file_path = ?2"
        )?;

        stmt.query_row(params![workspace_id, file_path], Self::map_row)
            .optional()
            .context("Failed to get file")
    }

    /// All files of a workspace, ordered by path
    pub async fn list(&self, workspace_id: &str) -> Result<Vec<FileRecord>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, workspace_id, project_id, file_path, content, file_type, content_hash, created_at, updated_at
             FROM project_files WHERE workspace_id = ?1 ORDER BY file_path"
        )?;

        let records = stmt
            .query_map(params![workspace_id], Self::map_row)?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect files")?;

        Ok(records)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<FileRecord> {
        Ok(FileRecord {
            id: row.get(0)?,
            workspace_id: row.get(1)?,
            project_id: row.get(2)?,
            file_path: row.get(3)?,
            content: row.get(4)?,
            file_type: FileType::from_str(&row.get::<_, String>(5)?),
            content_hash: row.get(6)?,
            created_at: parse_timestamp(&row.get::<_, String>(7)?),
            updated_at: parse_timestamp(&row.get::<_, String>(8)?),
        })
    }
}

enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

fn upsert(tx: &Transaction<'_>, workspace_id: &str, project_id: &str, file: &ProjectFile) -> Result<Upsert> {
    let hash = content_hash(&file.content);
    let now = Utc::now().to_rfc3339();

    let existing: Option<String> = tx
        .query_row(
            "SELECT content_hash FROM project_files WHERE workspace_id = ?1 AND file_path = ?2",
            params![workspace_id, file.path],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(current) if current == hash => Ok(Upsert::Unchanged),
        Some(_) => {
            tx.execute(
                "UPDATE project_files SET content = ?1, content_hash = ?2, file_type = ?3, project_id = ?4, updated_at = ?5
                 WHERE workspace_id = ?6 AND file_path = ?7",
                params![
                    file.content,
                    hash,
                    FileType::from_path(&file.path).as_str(),
                    project_id,
                    now,
                    workspace_id,
                    file.path,
                ],
            ).with_context(|| format!("Failed to update {}", file.path))?;
            Ok(Upsert::Updated)
        }
        None => {
            tx.execute(
                "INSERT INTO project_files (id, workspace_id, project_id, file_path, content, file_type, content_hash, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    Uuid::new_v4().to_string(),
                    workspace_id,
                    project_id,
                    file.path,
                    file.content,
                    FileType::from_path(&file.path).as_str(),
                    hash,
                    now,
                    now,
                ],
            ).with_context(|| format!("Failed to insert {}", file.path))?;
            Ok(Upsert::Inserted)
        }
    }
}
