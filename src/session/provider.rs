//! Generation provider trait

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use serde::Deserialize;

use super::error::GenerationError;
use super::model::{GenerationRequest, WireFile};
use crate::stream::CompleteEvent;

/// Raw body chunks of an event-stream response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, GenerationError>> + Send>>;

/// What the generation service answered with
pub enum GenerationResponse {
    /// `text/event-stream` body
    Stream(ByteStream),
    /// Single JSON completion (non-streaming fallback)
    Json(FallbackPayload),
}

/// Non-streaming completion body
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FallbackPayload {
    pub files: Vec<WireFile>,
    pub ai_message: Option<String>,
    pub models_used: Vec<String>,
    pub routes: Vec<String>,
    pub suggestions: Vec<String>,
    pub session_id: Option<String>,
}

impl FallbackPayload {
    /// Summary equivalent to a streamed `complete` event
    pub fn summary(&self) -> CompleteEvent {
        CompleteEvent {
            files_generated: self.files.len(),
            file_paths: self.files.iter().map(|f| f.path.clone()).collect(),
            models_used: self.models_used.clone(),
            ai_message: self.ai_message.clone(),
            routes: self.routes.clone(),
            suggestions: self.suggestions.clone(),
            session_id: self.session_id.clone(),
        }
    }
}

/// Opens generation requests against a backend.
///
/// The HTTP implementation talks to the generation service; tests substitute
/// scripted streams.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Start a generation and return its response body
    async fn open(
        &self,
        request: &GenerationRequest,
        credential: &str,
    ) -> Result<GenerationResponse, GenerationError>;
}
