pub mod llm_interface;
pub mod gemini_llm;
pub mod openai_compatible_llm;
pub mod llm_factory;

#[cfg(test)]
pub(crate) mod testing;

pub use llm_interface::*;
pub use gemini_llm::GeminiLLM;
pub use openai_compatible_llm::OpenAICompatibleLLM;
pub use llm_factory::LLMFactory;
