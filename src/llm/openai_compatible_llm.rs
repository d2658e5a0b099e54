use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::llm_interface::{check_response, CodeModel, TextStream};
use crate::error::LlmError;

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI compatible LLM implementation.
/// Works against OpenAI, Ollama, Groq, DeepSeek and anything else exposing
/// `/chat/completions`.
pub struct OpenAICompatibleLLM {
    client: Client,
    model: String,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl OpenAICompatibleLLM {
    pub fn new(
        model: String,
        base_url: Option<String>,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder().connect_timeout(timeout).build()?;

        info!(
            "Initialized OpenAICompatibleLLM: model={}, base_url={}",
            model, base_url
        );
        Ok(Self {
            client,
            model,
            base_url,
            api_key,
            request_timeout: timeout,
        })
    }

    async fn post(&self, prompt: &str, temperature: f32, stream: bool) -> Result<reqwest::Response, LlmError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature,
            stream,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&request);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }
        // A streamed body may outlive any fixed deadline
        if !stream {
            builder = builder.timeout(self.request_timeout);
        }
        check_response(builder.send().await?).await
    }
}

#[async_trait]
impl CodeModel for OpenAICompatibleLLM {
    async fn stream_generate(&self, prompt: &str, temperature: f32) -> Result<TextStream, LlmError> {
        let response = self.post(prompt, temperature, true).await?;
        debug!("Chat completion stream opened for model {}", self.model);

        let stream = response.bytes_stream().eventsource().filter_map(|event| async move {
            match event {
                Ok(event) => parse_stream_payload(&event.data).transpose(),
                Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
            }
        });
        Ok(Box::pin(stream))
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let response = self.post(prompt, temperature, false).await?;
        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message)
            .and_then(|message| message.content)
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".into()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn parse_stream_payload(data: &str) -> Result<Option<String>, LlmError> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let chunk: ChatResponse =
        serde_json::from_str(data).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    Ok(chunk
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.delta)
        .and_then(|delta| delta.content)
        .filter(|text| !text.is_empty()))
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    #[serde(default)]
    message: Option<ChatContent>,
    #[serde(default)]
    delta: Option<ChatContent>,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}
