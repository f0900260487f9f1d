pub mod ask;
pub mod serve;

use coinsage_agent::ResearchAgent;
use coinsage_config::AppConfig;
use coinsage_memory::SessionStore;
use coinsage_tools::LiveTools;
use std::sync::Arc;

/// Wire the production agent from configuration.
pub(crate) fn build_agent(config: &AppConfig) -> ResearchAgent {
    let generator = coinsage_providers::build_from_config(&config.generation);
    if generator.is_none() {
        tracing::warn!(
            "No generation API key configured (COINSAGE_API_KEY / OPENAI_API_KEY) — \
             planning degrades to general conversation"
        );
    }
    ResearchAgent::new(
        config,
        generator,
        Arc::new(LiveTools::from_config(&config.tools)),
        Arc::new(SessionStore::new(config.memory.clone())),
    )
}
