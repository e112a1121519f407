//! Conversation messages per project

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::params;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::connection::parse_timestamp;
use crate::db::Database;
use crate::session::ChatTurn;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub project_id: String,
    pub role: String,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

pub struct MessageRepository {
    db: Database,
}

impl MessageRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn append(&self, project_id: &str, role: &str, content: &str) -> Result<ChatMessage> {
        let message = ChatMessage {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            role: role.to_string(),
            content: content.to_string(),
            timestamp: Utc::now(),
        };

        let conn = self.db.lock().await;
        conn.execute(
            "INSERT INTO messages (id, project_id, role, content, timestamp) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                message.id,
                message.project_id,
                message.role,
                message.content,
                message.timestamp.to_rfc3339(),
            ],
        ).context("Failed to insert message")?;

        Ok(message)
    }

    /// The most recent `limit` turns, oldest first
    pub async fn history(&self, project_id: &str, limit: usize) -> Result<Vec<ChatTurn>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT role, content FROM messages WHERE project_id = ?1
             ORDER BY rowid DESC LIMIT ?2"
        )?;

        let mut turns = stmt
            .query_map(params![project_id, limit as i64], |row| {
                Ok(ChatTurn {
                    role: row.get(0)?,
                    content: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect messages")?;

        turns.reverse();
        Ok(turns)
    }

    pub async fn list(&self, project_id: &str) -> Result<Vec<ChatMessage>> {
        let conn = self.db.lock().await;
        let mut stmt = conn.prepare(
            "SELECT id, project_id, role, content, timestamp FROM messages
             WHERE project_id = ?1 ORDER BY rowid"
        )?;

        let messages = stmt
            .query_map(params![project_id], |row| {
                Ok(ChatMessage {
                    id: row.get(0)?,
                    project_id: row.get(1)?,
                    role: row.get(2)?,
                    content: row.get(3)?,
                    timestamp: parse_timestamp(&row.get::<_, String>(4)?),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("Failed to collect messages")?;

        Ok(messages)
    }
}
