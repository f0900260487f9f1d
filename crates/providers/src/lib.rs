//! Generation backend implementations for coinsage.
//!
//! The orchestration loop only knows the `Generator` trait from
//! `coinsage-core`; this crate supplies the OpenAI-compatible
//! implementation used in production. Most hosted backends (OpenAI,
//! OpenRouter, vLLM, Ollama) expose the same `/chat/completions` shape,
//! so one implementation covers them all.

pub mod openai_chat;

pub use openai_chat::OpenAiChatGenerator;

use coinsage_config::GenerationConfig;
use std::sync::Arc;

/// Build the configured generation backend, or `None` when no API key
/// is available. The agent degrades gracefully without one (planning
/// falls back to general intent, answers report the missing backend).
pub fn build_from_config(config: &GenerationConfig) -> Option<Arc<dyn coinsage_core::Generator>> {
    let api_key = config.api_key.as_deref()?.trim();
    if api_key.is_empty() {
        return None;
    }
    Some(Arc::new(OpenAiChatGenerator::new(
        &config.base_url,
        api_key,
        &config.model,
        config.timeout_secs,
    )))
}
