//! Generation failures, classified for the caller

use thiserror::Error;

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate-limit", "ratelimit", "too many requests"];
const QUOTA_MARKERS: &[&str] = &[
    "quota",
    "credits",
    "limit reached",
    "limit exceeded",
    "upgrade",
    "insufficient balance",
];

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    /// No bearer credential; rejected before any request is made
    #[error("Not authenticated")]
    NotAuthenticated,

    /// No workspace to generate into; rejected before any request is made
    #[error("No active workspace")]
    NoWorkspace,

    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    #[error("Quota exceeded: {message}")]
    QuotaExceeded { message: String },

    /// Network failure or non-success response
    #[error("Generation request failed: {message}")]
    Transport { status: Option<u16>, message: String },

    /// Explicit `error` event from the stream
    #[error("Generation failed: {message}")]
    Stream { message: String },

    /// Non-streaming response that could not be decoded
    #[error("Malformed generation response: {0}")]
    Malformed(String),
}

impl GenerationError {
    /// Classify a failed response by status and message
    pub fn classify(status: Option<u16>, message: impl Into<String>, retry_after_secs: Option<u64>) -> Self {
        let message = message.into();
        match status {
            Some(429) => GenerationError::RateLimited {
                message,
                retry_after_secs,
            },
            Some(402) => GenerationError::QuotaExceeded { message },
            _ => match Self::by_message(message.clone(), retry_after_secs) {
                Some(classified) => classified,
                None => GenerationError::Transport { status, message },
            },
        }
    }

    /// Classify an in-stream `error` event
    pub fn from_stream_message(message: impl Into<String>) -> Self {
        let message = message.into();
        match Self::by_message(message.clone(), None) {
            Some(classified) => classified,
            None => GenerationError::Stream { message },
        }
    }

    fn by_message(message: String, retry_after_secs: Option<u64>) -> Option<Self> {
        let lower = message.to_ascii_lowercase();
        if RATE_LIMIT_MARKERS.iter().any(|m| lower.contains(m)) {
            Some(GenerationError::RateLimited {
                message,
                retry_after_secs,
            })
        } else if QUOTA_MARKERS.iter().any(|m| lower.contains(m)) {
            Some(GenerationError::QuotaExceeded { message })
        } else {
            None
        }
    }

    /// Rejected before any network call
    pub fn is_precondition(&self) -> bool {
        matches!(self, GenerationError::NotAuthenticated | GenerationError::NoWorkspace)
    }

    /// Worth retrying as-is after a pause
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::RateLimited { .. } => true,
            GenerationError::Transport { status, .. } => status.map_or(true, |s| s >= 500),
            _ => false,
        }
    }

    /// Short advice to show next to the error
    pub fn guidance(&self) -> &'static str {
        match self {
            GenerationError::NotAuthenticated => "Sign in and try again.",
            GenerationError::NoWorkspace => "Open a project before generating.",
            GenerationError::RateLimited { .. } => "Too many requests. Wait a moment and try again.",
            GenerationError::QuotaExceeded { .. } => "Generation quota used up. Upgrade your plan to continue.",
            GenerationError::Transport { .. } => "Check your connection and try again.",
            GenerationError::Stream { .. } | GenerationError::Malformed(_) => {
                "The generation did not finish. Try rephrasing the request."
            }
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        GenerationError::Transport {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_take_precedence() {
        assert!(matches!(
            GenerationError::classify(Some(429), "slow down", Some(30)),
            GenerationError::RateLimited { retry_after_secs: Some(30), .. }
        ));
        assert!(matches!(
            GenerationError::classify(Some(402), "payment required", None),
            GenerationError::QuotaExceeded { .. }
        ));
    }

    #[test]
    fn messages_classify_without_status() {
        assert!(matches!(
            GenerationError::classify(Some(403), "Monthly quota exceeded", None),
            GenerationError::QuotaExceeded { .. }
        ));
        assert!(matches!(
            GenerationError::classify(Some(500), "Rate limit reached, retry soon", None),
            GenerationError::RateLimited { .. }
        ));
        assert_eq!(
            GenerationError::classify(Some(500), "boom", None),
            GenerationError::Transport {
                status: Some(500),
                message: "boom".into()
            }
        );
    }

    #[test]
    fn insufficient_needs_a_billing_word() {
        assert_eq!(
            GenerationError::from_stream_message("insufficient context to plan"),
            GenerationError::Stream {
                message: "insufficient context to plan".into()
            }
        );
        assert!(matches!(
            GenerationError::from_stream_message("Insufficient credits for this request"),
            GenerationError::QuotaExceeded { .. }
        ));
    }

    #[test]
    fn stream_errors_default_to_stream_variant() {
        assert_eq!(
            GenerationError::from_stream_message("model crashed"),
            GenerationError::Stream {
                message: "model crashed".into()
            }
        );
        assert!(matches!(
            GenerationError::from_stream_message("Out of credits"),
            GenerationError::QuotaExceeded { .. }
        ));
    }
}
