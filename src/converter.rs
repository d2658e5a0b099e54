use futures::{Stream, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, info};

use crate::config::LlmConfig;
use crate::error::{ConversionError, LlmError};
use crate::llm::CodeModel;
use crate::prompt::{build_conversion_prompt, build_format_prompt};

pub const CONVERSION_CONTEXT: &str = "code conversion stream";
pub const FORMAT_CONTEXT: &str = "code formatting";

/// One user-initiated conversion. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionRequest {
    pub code: String,
    pub source_language: String,
    pub target_language: String,
}

/// Converted code fragments in arrival order.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, ConversionError>> + Send>>;

/// Remote conversion client. Makes exactly one attempt per call.
#[derive(Clone)]
pub struct ConversionClient {
    llm: Arc<dyn CodeModel>,
    conversion_temperature: f32,
    format_temperature: f32,
}

impl ConversionClient {
    pub fn new(llm: Arc<dyn CodeModel>) -> Self {
        Self {
            llm,
            conversion_temperature: 0.1,
            format_temperature: 0.0,
        }
    }

    pub fn from_config(llm: Arc<dyn CodeModel>, config: &LlmConfig) -> Self {
        Self {
            llm,
            conversion_temperature: config.conversion_temperature,
            format_temperature: config.format_temperature,
        }
    }

    pub fn model(&self) -> &str {
        self.llm.model()
    }

    /// Open the conversion stream. Nothing is read until the caller polls,
    /// and dropping the stream abandons the response.
    pub async fn convert_stream(&self, request: &ConversionRequest) -> Result<ChunkStream, ConversionError> {
        info!(
            "Converting {} -> {} ({} bytes)",
            request.source_language,
            request.target_language,
            request.code.len()
        );
        let prompt = build_conversion_prompt(
            &request.code,
            &request.source_language,
            &request.target_language,
        );

        let stream = self
            .llm
            .stream_generate(&prompt, self.conversion_temperature)
            .await
            .map_err(|e| failure(CONVERSION_CONTEXT, e))?;

        Ok(Box::pin(stream.map(|chunk| {
            chunk
                .map(|text| {
                    debug!("Received chunk of {} bytes", text.len());
                    text
                })
                .map_err(|e| failure(CONVERSION_CONTEXT, e))
        })))
    }

    /// Drive the conversion stream to the end, handing each fragment to
    /// `on_chunk` before the next one is requested.
    pub async fn stream_convert<F>(&self, request: &ConversionRequest, mut on_chunk: F) -> Result<(), ConversionError>
    where
        F: FnMut(&str) + Send,
    {
        let mut stream = self.convert_stream(request).await?;
        while let Some(chunk) = stream.next().await {
            on_chunk(&chunk?);
        }
        Ok(())
    }

    /// Reformat PHP code to PSR-12 in one round trip.
    pub async fn format(&self, code: &str) -> Result<String, ConversionError> {
        info!("Formatting PHP code ({} bytes)", code.len());
        let prompt = build_format_prompt(code);
        let formatted = self
            .llm
            .generate(&prompt, self.format_temperature)
            .await
            .map_err(|e| failure(FORMAT_CONTEXT, e))?;
        Ok(formatted.trim().to_string())
    }
}

fn failure(context: &'static str, err: LlmError) -> ConversionError {
    error!("Error in {}: {}", context, err);
    ConversionError::new(context, &err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::testing::ScriptedLLM;

    fn request() -> ConversionRequest {
        ConversionRequest {
            code: "<?php echo 'hi'; ?>".into(),
            source_language: "PHP".into(),
            target_language: "Python".into(),
        }
    }

    #[tokio::test]
    async fn stream_convert_delivers_chunks_in_order() {
        let llm = Arc::new(ScriptedLLM::streaming(&["A", "B", "C"]));
        let client = ConversionClient::new(llm.clone());

        let mut seen = Vec::new();
        client
            .stream_convert(&request(), |chunk| seen.push(chunk.to_string()))
            .await
            .unwrap();

        assert_eq!(seen, ["A", "B", "C"]);
        let requests = llm.requests();
        assert_eq!(requests.len(), 1);
        assert!(requests[0].0.contains("convert the following PHP code into Python"));
        assert_eq!(requests[0].1, 0.1);
    }

    #[tokio::test]
    async fn rejected_stream_is_wrapped_with_context() {
        let client = ConversionClient::new(Arc::new(ScriptedLLM::rejecting("connection refused")));
        let err = client.stream_convert(&request(), |_| {}).await.unwrap_err();
        assert_eq!(err.context, CONVERSION_CONTEXT);
        assert_eq!(
            err.message,
            "Failed during code conversion stream: stream error: connection refused"
        );
    }

    #[tokio::test]
    async fn mid_stream_failure_keeps_earlier_chunks() {
        let llm = ScriptedLLM::streaming(&["partial"]).failing_after("reset by peer");
        let client = ConversionClient::new(Arc::new(llm));

        let mut seen = String::new();
        let err = client
            .stream_convert(&request(), |chunk| seen.push_str(chunk))
            .await
            .unwrap_err();
        assert_eq!(seen, "partial");
        assert!(err.message.contains("reset by peer"));
    }

    #[tokio::test]
    async fn format_trims_and_uses_zero_temperature() {
        let llm = Arc::new(ScriptedLLM::completing("\n  <?php\n\necho 'hi';\n  \n"));
        let client = ConversionClient::new(llm.clone());

        let formatted = client.format("<?php echo 'hi'; ?>").await.unwrap();
        assert_eq!(formatted, "<?php\n\necho 'hi';");
        let requests = llm.requests();
        assert!(requests[0].0.contains("PSR-12"));
        assert_eq!(requests[0].1, 0.0);
    }

    #[tokio::test]
    async fn format_failure_uses_format_context() {
        let client = ConversionClient::new(Arc::new(ScriptedLLM::rejecting("quota")));
        let err = client.format("<?php ?>").await.unwrap_err();
        assert_eq!(err.context, FORMAT_CONTEXT);
        assert!(err.message.starts_with("Failed during code formatting:"));
    }

    #[tokio::test]
    async fn temperatures_follow_config() {
        let llm = Arc::new(ScriptedLLM::streaming(&["x"]));
        let config = LlmConfig {
            conversion_temperature: 0.5,
            ..LlmConfig::default()
        };
        let client = ConversionClient::from_config(llm.clone(), &config);
        client.stream_convert(&request(), |_| {}).await.unwrap();
        assert_eq!(llm.requests()[0].1, 0.5);
    }
}
