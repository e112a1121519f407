//! Typed generation events carried in `data:` lines

use serde::{Deserialize, Serialize};

use crate::store::FilePatch;

/// One decoded generation event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Stage(StageEvent),
    File(FileEvent),
    Complete(CompleteEvent),
    Error(ErrorEvent),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Context,
    Intent,
    Plan,
    Generate,
    Validate,
    Repair,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Context => "context",
            Stage::Intent => "intent",
            Stage::Plan => "plan",
            Stage::Generate => "generate",
            Stage::Validate => "validate",
            Stage::Repair => "repair",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Start,
    End,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageEvent {
    pub stage: Stage,
    pub status: StageStatus,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileCommand {
    CreateFile,
    UpdateFile,
    PatchFile,
    DeleteFile,
}

impl FileCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileCommand::CreateFile => "CREATE_FILE",
            FileCommand::UpdateFile => "UPDATE_FILE",
            FileCommand::PatchFile => "PATCH_FILE",
            FileCommand::DeleteFile => "DELETE_FILE",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileEvent {
    pub command: FileCommand,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patches: Option<Vec<FilePatch>>,
}

/// Terminal summary of a generation
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct CompleteEvent {
    pub files_generated: usize,
    pub file_paths: Vec<String>,
    pub models_used: Vec<String>,
    pub ai_message: Option<String>,
    pub routes: Vec<String>,
    pub suggestions: Vec<String>,
    pub session_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorEvent {
    #[serde(default)]
    pub message: String,
}
