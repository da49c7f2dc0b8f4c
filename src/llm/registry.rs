//! Backend selection
//!
//! The backend is chosen once at startup from the environment and injected
//! into the conversation manager; turn logic never branches on it.

use super::{LlmClient, LoggingClient, OpenAiClient, StubClient};
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_MODEL: &str = "gpt-4o-mini";
const DEFAULT_LOCAL_BASE_URL: &str = "http://localhost:11434/v1";

/// Configuration for the LLM backend
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// Backend selector: `openai` (default), `local`, or `stub`
    pub backend: Option<String>,
    pub openai_api_key: Option<String>,
    /// Base URL for the `local` backend (an OpenAI-compatible server)
    pub base_url: Option<String>,
    pub model: Option<String>,
}

impl LlmConfig {
    pub fn from_env() -> Self {
        Self {
            backend: std::env::var("NEMA_LLM_BACKEND").ok(),
            openai_api_key: std::env::var("OPENAI_API_KEY").ok(),
            base_url: std::env::var("NEMA_LLM_BASE_URL").ok(),
            model: std::env::var("NEMA_MODEL").ok(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown LLM backend: {0} (expected openai, local, or stub)")]
    UnknownBackend(String),
    #[error("OPENAI_API_KEY is required for the openai backend")]
    MissingApiKey,
}

/// Build the one configured backend, wrapped with logging
pub fn build_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, ConfigError> {
    let model = config
        .model
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL.to_string());

    let inner: Arc<dyn LlmClient> = match config.backend.as_deref() {
        None | Some("openai") => {
            let api_key = config
                .openai_api_key
                .clone()
                .filter(|key| !key.is_empty())
                .ok_or(ConfigError::MissingApiKey)?;
            Arc::new(OpenAiClient::remote(api_key, model))
        }
        Some("local") => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| DEFAULT_LOCAL_BASE_URL.to_string());
            Arc::new(OpenAiClient::local(base_url, model))
        }
        Some("stub") => Arc::new(StubClient::new("stub")),
        Some(other) => return Err(ConfigError::UnknownBackend(other.to_string())),
    };

    Ok(Arc::new(LoggingClient::new(inner)))
}
