use thiserror::Error;

/// Errors raised by a model backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => Self::Authentication(body),
            _ => Self::Api { status, body },
        }
    }
}

/// The single failure kind surfaced by the conversion client.
///
/// `message` is already user-facing: it carries the context label and the
/// underlying cause.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ConversionError {
    pub context: &'static str,
    pub message: String,
}

impl ConversionError {
    pub fn new(context: &'static str, cause: &str) -> Self {
        let message = if cause.trim().is_empty() {
            format!("An unexpected error occurred during {context}.")
        } else {
            format!("Failed during {context}: {cause}")
        };
        Self { context, message }
    }
}
