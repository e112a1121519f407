//! Generation session and request types

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::ProjectFile;
use crate::stream::Stage;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Pending,
    Planning,
    Generating,
    Validating,
    Completed,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Planning => "planning",
            SessionStatus::Generating => "generating",
            SessionStatus::Validating => "validating",
            SessionStatus::Completed => "completed",
            SessionStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(SessionStatus::Pending),
            "planning" => Ok(SessionStatus::Planning),
            "generating" => Ok(SessionStatus::Generating),
            "validating" => Ok(SessionStatus::Validating),
            "completed" => Ok(SessionStatus::Completed),
            "failed" => Ok(SessionStatus::Failed),
            _ => anyhow::bail!("Unknown session status: {}", s),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Failed)
    }

    /// Status a stage moves the session into; context and intent stay pending
    pub fn for_stage(stage: Stage) -> Self {
        match stage {
            Stage::Context | Stage::Intent => SessionStatus::Pending,
            Stage::Plan => SessionStatus::Planning,
            Stage::Generate => SessionStatus::Generating,
            Stage::Validate | Stage::Repair => SessionStatus::Validating,
        }
    }
}

/// One AI invocation for a project
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationSession {
    pub id: String,
    pub project_id: String,
    pub prompt: String,
    pub status: SessionStatus,
    pub files_generated: usize,
    pub model_used: Option<String>,
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GenerationSession {
    pub fn new(project_id: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            project_id: project_id.into(),
            prompt: prompt.into(),
            status: SessionStatus::Pending,
            files_generated: 0,
            model_used: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a non-terminal status; ignored once the session has finished
    pub fn advance(&mut self, status: SessionStatus) {
        if !self.is_terminal() && !status.is_terminal() {
            self.status = status;
        }
    }

    pub fn complete(&mut self, files_generated: usize, model_used: Option<String>) {
        self.status = SessionStatus::Completed;
        self.files_generated = files_generated;
        self.model_used = model_used;
        self.error = None;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = SessionStatus::Failed;
        self.error = Some(error.into());
        self.completed_at = Some(Utc::now());
    }
}

/// One prior conversation turn sent with a request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

/// A file as sent to, or returned by, the generation service
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WireFile {
    pub path: String,
    #[serde(default)]
    pub content: String,
}

impl From<&ProjectFile> for WireFile {
    fn from(file: &ProjectFile) -> Self {
        Self {
            path: file.path.clone(),
            content: file.content.clone(),
        }
    }
}

/// Body of a generation request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub project_id: String,
    pub workspace_id: String,
    pub prompt: String,
    pub conversation_history: Vec<ChatTurn>,
    pub existing_files: Vec<WireFile>,
}

impl GenerationRequest {
    pub fn new(
        project_id: impl Into<String>,
        workspace_id: impl Into<String>,
        prompt: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            workspace_id: workspace_id.into(),
            prompt: prompt.into(),
            conversation_history: Vec::new(),
            existing_files: Vec::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<ChatTurn>) -> Self {
        self.conversation_history = history;
        self
    }

    pub fn with_files(mut self, files: &[ProjectFile]) -> Self {
        self.existing_files = files.iter().map(WireFile::from).collect();
        self
    }
}
