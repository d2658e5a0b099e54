use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::error::LlmError;

/// Lazy, finite sequence of generated text fragments, in the order the
/// remote side produced them. Dropping it stops reading the response.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// A hosted text model that can answer a single prompt.
///
/// Stateless: no conversation history or system prompt is kept between calls.
#[async_trait]
pub trait CodeModel: Send + Sync {
    /// Open a streaming completion for `prompt`.
    async fn stream_generate(&self, prompt: &str, temperature: f32) -> Result<TextStream, LlmError>;

    /// Run a single-shot completion and return the full text.
    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;

    /// Model identifier sent to the backend.
    fn model(&self) -> &str;
}

/// Turn a non-2xx response into an [`LlmError`], keeping the body as context.
pub(crate) async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(LlmError::from_status(status.as_u16(), body))
}
