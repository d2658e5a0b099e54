use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

use super::llm_interface::{check_response, CodeModel, TextStream};
use crate::error::LlmError;

pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Google Gemini client speaking the `generateContent` REST API.
pub struct GeminiLLM {
    client: Client,
    model: String,
    base_url: String,
    api_key: String,
    request_timeout: Duration,
}

impl GeminiLLM {
    pub fn new(
        model: String,
        base_url: Option<String>,
        api_key: String,
        timeout: Duration,
    ) -> Result<Self, LlmError> {
        if api_key.trim().is_empty() {
            return Err(LlmError::Configuration("API key required for Gemini".into()));
        }
        let base_url = base_url
            .unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();
        let client = Client::builder().connect_timeout(timeout).build()?;

        info!("Initialized GeminiLLM: model={}, base_url={}", model, base_url);
        Ok(Self {
            client,
            model,
            base_url,
            api_key,
            request_timeout: timeout,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.base_url, self.model, method)
    }

    /// Single-shot calls are bounded by `request_timeout`. Streams are bounded
    /// only by the connect timeout.
    async fn post(
        &self,
        url: &str,
        prompt: &str,
        temperature: f32,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let request = GeminiRequest {
            contents: vec![GeminiContent {
                role: "user",
                parts: vec![GeminiRequestPart { text: prompt }],
            }],
            generation_config: GeminiGenerationConfig { temperature },
        };

        let mut builder = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(&request);
        if !stream {
            builder = builder.timeout(self.request_timeout);
        }
        check_response(builder.send().await?).await
    }
}

#[async_trait]
impl CodeModel for GeminiLLM {
    async fn stream_generate(&self, prompt: &str, temperature: f32) -> Result<TextStream, LlmError> {
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let response = self.post(&url, prompt, temperature, true).await?;
        debug!("Gemini stream opened for model {}", self.model);

        let stream = response.bytes_stream().eventsource().filter_map(|event| async move {
            match event {
                Ok(event) => parse_stream_payload(&event.data).transpose(),
                Err(e) => Some(Err(LlmError::Stream(e.to_string()))),
            }
        });
        Ok(Box::pin(stream))
    }

    async fn generate(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        let url = self.endpoint("generateContent");
        let response = self.post(&url, prompt, temperature, false).await?;
        let body: GeminiResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        body.into_text()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

/// Decode one SSE `data:` payload. Fragments without text yield `None`.
fn parse_stream_payload(data: &str) -> Result<Option<String>, LlmError> {
    let data = data.trim();
    if data.is_empty() {
        return Ok(None);
    }
    let response: GeminiResponse =
        serde_json::from_str(data).map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
    let text = response.into_text()?;
    Ok(if text.is_empty() { None } else { Some(text) })
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<GeminiContent<'a>>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent<'a> {
    role: &'static str,
    parts: Vec<GeminiRequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct GeminiRequestPart<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    error: Option<GeminiErrorBody>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContentResponse>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiContentResponse {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct GeminiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

impl GeminiResponse {
    fn into_text(self) -> Result<String, LlmError> {
        if let Some(error) = self.error {
            return Err(LlmError::from_status(error.code, error.message));
        }
        Ok(self
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default())
    }
}
