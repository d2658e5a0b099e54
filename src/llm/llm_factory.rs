use anyhow::Result;
use std::sync::Arc;
use tracing::info;

use super::gemini_llm::GeminiLLM;
use super::llm_interface::CodeModel;
use super::openai_compatible_llm::OpenAICompatibleLLM;
use crate::config::LlmConfig;

/// Factory for creating model backends
pub struct LLMFactory;

impl LLMFactory {
    /// Create the backend named by `config.provider`.
    pub fn create_llm(config: &LlmConfig, api_key: String) -> Result<Arc<dyn CodeModel>> {
        info!("Initializing LLM: {}", config.provider);

        match config.provider.as_str() {
            "gemini_llm" | "gemini" => Ok(Arc::new(GeminiLLM::new(
                config.model.clone(),
                config.base_url.clone(),
                api_key,
                config.timeout(),
            )?)),
            "openai_compatible_llm" | "openai_llm" | "ollama_llm" | "deepseek_llm"
            | "groq_llm" | "mistral_llm" => Ok(Arc::new(OpenAICompatibleLLM::new(
                config.model.clone(),
                config.base_url.clone(),
                api_key,
                config.timeout(),
            )?)),
            other => Err(anyhow::anyhow!("Unsupported LLM provider: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_known_providers() {
        let gemini = LLMFactory::create_llm(&LlmConfig::default(), "key".into()).unwrap();
        assert_eq!(gemini.model(), "gemini-2.5-flash");

        let config = LlmConfig {
            provider: "ollama_llm".into(),
            model: "qwen2.5-coder".into(),
            base_url: Some("http://localhost:11434/v1".into()),
            ..LlmConfig::default()
        };
        let ollama = LLMFactory::create_llm(&config, String::new()).unwrap();
        assert_eq!(ollama.model(), "qwen2.5-coder");
    }

    #[test]
    fn unknown_provider_is_rejected() {
        let config = LlmConfig {
            provider: "llama_cpp_llm".into(),
            ..LlmConfig::default()
        };
        let err = LLMFactory::create_llm(&config, "key".into()).err().unwrap();
        assert!(err.to_string().contains("Unsupported LLM provider"));
    }
}
