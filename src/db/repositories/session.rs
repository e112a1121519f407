//! Generation session repository
//!
//! Session status lives here rather than in client memory, so a session left
//! mid-stream by a crash or reload can be found and closed on the next open.

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::params;

use crate::db::connection::parse_timestamp;
use crate::db::Database;
use crate::session::{GenerationSession, SessionStatus};

const NON_TERMINAL: &str = "('pending', 'planning', 'generating', 'validating')";

pub struct SessionRepository {
    db: Database,
}

impl SessionRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Get the database reference
    pub fn db(&self) -> &Database {
        &self.db
    }

    /// Insert a new session row
    pub async fn create(&self, session: &GenerationSession) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO generation_sessions (id, project_id, prompt, status, files_generated, model_used, error, started_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                session.id,
                session.project_id,
                session.prompt,
                session.status.as_str(),
                session.files_generated as i64,
                session.model_used,
                session.error,
                session.started_at.to_rfc3339(),
                session.completed_at.map(|t| t.to_rfc3339()),
            ],
        ).context("Failed to insert session")?;

        tracing::debug!("Created session: {}", session.id);
        Ok(())
    }

    /// Write back status, counters and completion fields
    pub async fn update(&self, session: &GenerationSession) -> Result<()> {
        let conn = self.db.lock().await;
        conn.execute(
            "UPDATE generation_sessions
             SET status = ?1, files_generated = ?2, model_used = ?3, error = ?4, completed_at = ?5
             WHERE id = ?6",
            params![
                session.status.as_str(),
                session.files_generated as i64,
                session.model_used,
                session.error,
                session.completed_at.map(|t| t.to_rfc3339()),
                session.id,
            ],
        ).context("Failed to update session")?;

        tracing::debug!("Updated session {} status to {}", session.id, session.status.as_str());
        Ok(())
    }

    /// Get a session by ID
    pub async fn get(&self, id: &str) -> Result<Option<GenerationSession>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, prompt, status, files_generated, model_used, error, started_at, completed_at
             FROM generation_sessions WHERE id = ?1"
        )?;

        match stmt.query_row(params![id], Self::map_row) {
            Ok(session) => Ok(Some(session)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e).context("Failed to get session"),
        }
    }

    /// Sessions of a project, newest first
    pub async fn list(&self, project_id: &str, status: Option<SessionStatus>) -> Result<Vec<GenerationSession>> {
        let conn = self.db.lock().await;

        let mut query = String::from(
            "SELECT id, project_id, prompt, status, files_generated, model_used, error, started_at, completed_at
             FROM generation_sessions WHERE project_id = ?1"
        );
        if status.is_some() {
            query.push_str(" AND status = ?2");
        }
        query.push_str(" ORDER BY started_at DESC");

        let mut stmt = conn.prepare(&query)?;
        let sessions = match status {
            Some(st) => stmt
                .query_map(params![project_id, st.as_str()], Self::map_row)?
                .collect::<std::result::Result<Vec<_>, _>>(),
            None => stmt
                .query_map(params![project_id], Self::map_row)?
                .collect::<std::result::Result<Vec<_>, _>>(),
        }
        .context("Failed to collect sessions")?;

        Ok(sessions)
    }

    /// Close sessions that never reached a terminal status.
    ///
    /// Returns how many were marked failed.
    pub async fn fail_orphaned(&self, project_id: &str) -> Result<usize> {
        let conn = self.db.lock().await;
        let now = Utc::now().to_rfc3339();
        let updated = conn.execute(
            &format!(
                "UPDATE generation_sessions SET status = 'failed', error = 'interrupted', completed_at = ?1
                 WHERE project_id = ?2 AND status IN {}",
                NON_TERMINAL
            ),
            params![now, project_id],
        ).context("Failed to close orphaned sessions")?;

        if updated > 0 {
            tracing::info!("Marked {} interrupted sessions as failed for project {}", updated, project_id);
        }
        Ok(updated)
    }

    fn map_row(row: &rusqlite::Row) -> rusqlite::Result<GenerationSession> {
        Ok(GenerationSession {
            id: row.get(0)?,
            project_id: row.get(1)?,
            prompt: row.get(2)?,
            status: SessionStatus::from_str(&row.get::<_, String>(3)?).unwrap_or(SessionStatus::Failed),
            files_generated: row.get::<_, i64>(4)?.max(0) as usize,
            model_used: row.get(5)?,
            error: row.get(6)?,
            started_at: parse_timestamp(&row.get::<_, String>(7)?),
            completed_at: row
                .get::<_, Option<String>>(8)?
                .map(|t| parse_timestamp(&t)),
        })
    }
}
