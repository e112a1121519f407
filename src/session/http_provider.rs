//! HTTP generation provider

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header::{ACCEPT, CONTENT_TYPE, RETRY_AFTER};
use reqwest::Client;
use tracing::{debug, error, info};

use super::error::GenerationError;
use super::model::GenerationRequest;
use super::provider::{FallbackPayload, GenerationProvider, GenerationResponse};

const EVENT_STREAM: &str = "text/event-stream";

/// Provider backed by the generation service's HTTP endpoint
pub struct HttpGenerationProvider {
    client: Client,
    endpoint: String,
}

impl HttpGenerationProvider {
    /// Create a provider. Only connecting is bounded by a timeout: a healthy
    /// stream may legitimately stay open for minutes.
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> Self {
        let client = Client::builder()
            .connect_timeout(connect_timeout)
            .build()
            .unwrap_or_else(|_| Client::new()); // Fallback if config fails

        Self {
            client,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl GenerationProvider for HttpGenerationProvider {
    async fn open(
        &self,
        request: &GenerationRequest,
        credential: &str,
    ) -> Result<GenerationResponse, GenerationError> {
        debug!(
            "Opening generation for project {} ({} files, {} history turns)",
            request.project_id,
            request.existing_files.len(),
            request.conversation_history.len()
        );

        let response = match self
            .client
            .post(&self.endpoint)
            .bearer_auth(credential)
            .header(ACCEPT, format!("{}, application/json", EVENT_STREAM))
            .json(request)
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                error!("Generation HTTP error: {}", e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string());
            error!("Generation API error: {} - {}", status, message);
            return Err(GenerationError::classify(Some(status.as_u16()), message, retry_after));
        }

        let is_stream = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(EVENT_STREAM));

        if is_stream {
            info!("Streaming generation for project {}", request.project_id);
            let stream = response
                .bytes_stream()
                .map(|chunk| chunk.map_err(GenerationError::from));
            return Ok(GenerationResponse::Stream(Box::pin(stream)));
        }

        let body = response.text().await?;
        let payload: FallbackPayload = serde_json::from_str(&body)
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        info!(
            "Received non-streaming generation with {} files",
            payload.files.len()
        );
        Ok(GenerationResponse::Json(payload))
    }
}

/// Pull a human-readable message out of an error body
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        let message = value
            .get("error")
            .and_then(|e| e.as_str().or_else(|| e.get("message").and_then(|m| m.as_str())))
            .or_else(|| value.get("message").and_then(|m| m.as_str()));
        if let Some(message) = message {
            return Some(message.to_string());
        }
    }

    Some(trimmed.chars().take(300).collect())
}
