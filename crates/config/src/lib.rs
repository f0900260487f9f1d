//! Configuration loading, validation, and management for coinsage.
//!
//! Loads configuration from `coinsage.toml` with environment variable
//! overrides for secrets. Every field has a serde default so a missing
//! or partial file still yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// The root configuration structure.
///
/// Maps directly to `coinsage.toml`.
#[derive(Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Generation backend settings
    #[serde(default)]
    pub generation: GenerationConfig,

    /// Data provider (tool) settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Session memory settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Gateway settings
    #[serde(default)]
    pub gateway: GatewayConfig,
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("generation.model", &self.generation.model)
            .field("generation.api_key", &redact(&self.generation.api_key))
            .field("tools.news_api_key", &redact(&self.tools.news_api_key))
            .field("gateway.host", &self.gateway.host)
            .field("gateway.port", &self.gateway.port)
            .field("gateway.shared_secret", &redact(&self.gateway.shared_secret))
            .finish_non_exhaustive()
    }
}

/// Generation backend configuration (OpenAI-compatible chat endpoint).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// API key; usually supplied via environment instead of the file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of the chat-completions endpoint.
    #[serde(default = "default_generation_base_url")]
    pub base_url: String,

    /// Model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature for answer synthesis.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-request timeout in seconds.
    #[serde(default = "default_generation_timeout")]
    pub timeout_secs: u64,
}

fn default_generation_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_temperature() -> f32 {
    0.2
}
fn default_generation_timeout() -> u64 {
    60
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_generation_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            timeout_secs: default_generation_timeout(),
        }
    }
}

/// Data provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Per-call timeout in seconds for each provider request.
    #[serde(default = "default_call_timeout")]
    pub call_timeout_secs: u64,

    /// TTL for the in-process response cache.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// News provider credential; news degrades gracefully without it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub news_api_key: Option<String>,

    /// Price/profile provider base URL.
    #[serde(default = "default_price_api_base")]
    pub price_api_base: String,

    /// News provider base URL.
    #[serde(default = "default_news_api_base")]
    pub news_api_base: String,

    /// DEX search provider base URL.
    #[serde(default = "default_dex_api_base")]
    pub dex_api_base: String,

    /// Fixed price-history window in days.
    #[serde(default = "default_history_days")]
    pub history_days: u32,

    /// Maximum disambiguation candidates returned to the caller.
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: usize,
}

fn default_call_timeout() -> u64 {
    15
}
fn default_cache_ttl() -> u64 {
    60
}
fn default_price_api_base() -> String {
    "https://api.coingecko.com/api/v3".into()
}
fn default_news_api_base() -> String {
    "https://cryptopanic.com/api/developer/v2".into()
}
fn default_dex_api_base() -> String {
    "https://api.geckoterminal.com/api/v2".into()
}
fn default_history_days() -> u32 {
    30
}
fn default_candidate_limit() -> usize {
    8
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            call_timeout_secs: default_call_timeout(),
            cache_ttl_secs: default_cache_ttl(),
            news_api_key: None,
            price_api_base: default_price_api_base(),
            news_api_base: default_news_api_base(),
            dex_api_base: default_dex_api_base(),
            history_days: default_history_days(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

/// Session memory configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Hard ceiling on summary + turns, in characters.
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,

    /// Recent turns kept verbatim, never summarized away.
    #[serde(default = "default_keep_last_turns")]
    pub keep_last_turns: usize,

    /// Target length of the rolling summary.
    #[serde(default = "default_summary_target_chars")]
    pub summary_target_chars: usize,

    /// Idle seconds before a session is evicted.
    #[serde(default = "default_session_ttl")]
    pub session_ttl_secs: u64,

    /// Maximum live sessions; least-recently-used are evicted beyond this.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

fn default_max_chars() -> usize {
    9000
}
fn default_keep_last_turns() -> usize {
    6
}
fn default_summary_target_chars() -> usize {
    900
}
fn default_session_ttl() -> u64 {
    7200
}
fn default_max_sessions() -> usize {
    1000
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_chars: default_max_chars(),
            keep_last_turns: default_keep_last_turns(),
            summary_target_chars: default_summary_target_chars(),
            session_ttl_secs: default_session_ttl(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Context assembly configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Hard ceiling on the serialized Context handed to generation.
    #[serde(default = "default_context_max_chars")]
    pub max_chars: usize,
}

fn default_context_max_chars() -> usize {
    14_000
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_chars: default_context_max_chars(),
        }
    }
}

/// Gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret required in `X-Auth-Token` on /v1 routes.
    /// When absent the gate is disabled (local development).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared_secret: Option<String>,
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8080
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shared_secret: None,
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

impl AppConfig {
    /// Load configuration from a file path, then apply env overrides.
    ///
    /// Environment variables consulted:
    /// - `COINSAGE_API_KEY` / `OPENAI_API_KEY` — generation credential
    /// - `COINSAGE_MODEL` — generation model
    /// - `CRYPTOPANIC_API_KEY` — news credential
    /// - `COINSAGE_SHARED_SECRET` — gateway auth gate
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::load_from(p)?,
            None => {
                let default = Path::new("coinsage.toml");
                if default.exists() {
                    Self::load_from(default)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file. Missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "Config file not found, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) {
        if self.generation.api_key.is_none() {
            self.generation.api_key = std::env::var("COINSAGE_API_KEY")
                .ok()
                .or_else(|| std::env::var("OPENAI_API_KEY").ok())
                .filter(|s| !s.trim().is_empty());
        }
        if let Ok(model) = std::env::var("COINSAGE_MODEL")
            && !model.trim().is_empty()
        {
            self.generation.model = model;
        }
        if self.tools.news_api_key.is_none() {
            self.tools.news_api_key = std::env::var("CRYPTOPANIC_API_KEY")
                .ok()
                .filter(|s| !s.trim().is_empty());
        }
        if self.gateway.shared_secret.is_none() {
            self.gateway.shared_secret = std::env::var("COINSAGE_SHARED_SECRET")
                .ok()
                .filter(|s| !s.trim().is_empty());
        }
    }
}
