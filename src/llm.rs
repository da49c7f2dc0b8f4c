//! Language-model client abstraction
//!
//! A common interface over the backends that can produce a completion for
//! the conversation transcript: a remote OpenAI-compatible provider, a
//! locally hosted OpenAI-compatible server, and a deterministic stub.

mod error;
mod openai;
mod registry;
mod stub;
mod types;

pub use error::{LlmError, LlmErrorKind};
pub use openai::OpenAiClient;
pub use registry::{build_client, ConfigError, LlmConfig};
pub use stub::StubClient;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Callback invoked with each chunk of a progressively delivered reply
pub type DeltaHandler = dyn Fn(&str) + Send + Sync;

/// Common interface for language-model backends
///
/// Implementations never mutate application state, honor the caller's
/// cancellation token, and perform no internal retries.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Produce the assistant's reply text for the given transcript.
    ///
    /// When `on_delta` is supplied the backend may deliver the reply
    /// progressively; either way the returned string is the final
    /// assembled text.
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<String, LlmError>;

    /// Get the model ID
    fn model_id(&self) -> &str;
}

/// Logging wrapper for LLM clients
pub struct LoggingClient {
    inner: Arc<dyn LlmClient>,
    model_id: String,
}

impl LoggingClient {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        let model_id = inner.model_id().to_string();
        Self { inner, model_id }
    }
}

#[async_trait]
impl LlmClient for LoggingClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<String, LlmError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request, cancel, on_delta).await;
        let duration = start.elapsed();

        match &result {
            Ok(text) => {
                tracing::info!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    messages = request.messages.len(),
                    reply_chars = text.len(),
                    "LLM request completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %self.model_id,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "LLM request failed"
                );
            }
        }

        result
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
