//! OpenAI-compatible chat-completions client
//!
//! Serves both the remote provider and locally hosted servers that speak
//! the same wire protocol; the two differ only in base URL and whether an
//! API key is sent.

use super::{ChatRole, CompletionRequest, DeltaHandler, LlmClient, LlmError};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI-compatible client
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
}

impl OpenAiClient {
    /// Client for the hosted provider
    pub fn remote(api_key: String, model: String) -> Self {
        Self::new(Some(api_key), OPENAI_BASE_URL.to_string(), model)
    }

    /// Client for a locally hosted OpenAI-compatible server; no key sent
    pub fn local(base_url: String, model: String) -> Self {
        Self::new(None, base_url, model)
    }

    fn new(api_key: Option<String>, base_url: String, model: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn translate_request<'a>(
        &'a self,
        request: &'a CompletionRequest,
        stream: bool,
    ) -> WireRequest<'a> {
        WireRequest {
            model: &self.model,
            messages: request
                .messages
                .iter()
                .map(|m| WireMessage {
                    role: match m.role {
                        ChatRole::Human => "user",
                        ChatRole::Assistant => "assistant",
                    },
                    content: &m.text,
                })
                .collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            stream,
        }
    }

    async fn send(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        stream: bool,
    ) -> Result<reqwest::Response, LlmError> {
        let body = self.translate_request(request, stream);

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = tokio::select! {
            result = builder.send() => result.map_err(|e| {
                if e.is_timeout() {
                    LlmError::network(format!("Request timeout: {e}"))
                } else if e.is_connect() {
                    LlmError::network(format!("Connection failed: {e}"))
                } else {
                    LlmError::unknown(format!("Request failed: {e}"))
                }
            })?,
            () = cancel.cancelled() => {
                return Err(LlmError::cancelled("completion cancelled by caller"));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_error(status, &body));
        }

        Ok(response)
    }

    async fn complete_buffered(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
    ) -> Result<String, LlmError> {
        let response = self.send(request, cancel, false).await?;

        let body = tokio::select! {
            result = response.text() => result
                .map_err(|e| LlmError::network(format!("Failed to read response: {e}")))?,
            () = cancel.cancelled() => {
                return Err(LlmError::cancelled("completion cancelled by caller"));
            }
        };

        let parsed: WireResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::response_decode(format!("Failed to parse response: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::response_decode("completion contained no choices"))
    }

    async fn complete_streaming(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: &DeltaHandler,
    ) -> Result<String, LlmError> {
        let response = self.send(request, cancel, true).await?;

        let mut stream = response.bytes_stream();
        let mut pending = String::new();
        let mut text = String::new();

        loop {
            let chunk = tokio::select! {
                chunk = stream.next() => chunk,
                () = cancel.cancelled() => {
                    return Err(LlmError::cancelled("completion cancelled mid-stream"));
                }
            };
            let Some(chunk) = chunk else { break };
            let bytes =
                chunk.map_err(|e| LlmError::network(format!("Stream read failed: {e}")))?;
            pending.push_str(&String::from_utf8_lossy(&bytes));

            while let Some(newline) = pending.find('\n') {
                let line: String = pending.drain(..=newline).collect();
                if let Some(delta) = parse_sse_line(line.trim()) {
                    text.push_str(&delta);
                    on_delta(&delta);
                }
            }
        }

        Ok(text)
    }
}

/// Extract the content delta from one server-sent-events line, if any
fn parse_sse_line(line: &str) -> Option<String> {
    let data = line.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }
    let chunk: WireChunk = serde_json::from_str(data).ok()?;
    chunk.choices.into_iter().next()?.delta.content
}

fn classify_error(status: reqwest::StatusCode, body: &str) -> LlmError {
    match status.as_u16() {
        401 | 403 => LlmError::auth(format!("Authentication failed: {body}")),
        429 => LlmError::rate_limit(format!("Rate limited: {body}")),
        400 => LlmError::invalid_request(format!("Invalid request: {body}")),
        500..=599 => LlmError::server_error(format!("Server error: {body}")),
        _ => LlmError::unknown(format!("HTTP {status}: {body}")),
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        cancel: &CancellationToken,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<String, LlmError> {
        match on_delta {
            Some(handler) => self.complete_streaming(request, cancel, handler).await,
            None => self.complete_buffered(request, cancel).await,
        }
    }

    fn model_id(&self) -> &str {
        &self.model
    }
}

// OpenAI-compatible wire types

#[derive(Debug, Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireChunk {
    choices: Vec<WireChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChunkChoice {
    delta: WireChunkDelta,
}

#[derive(Debug, Deserialize)]
struct WireChunkDelta {
    content: Option<String>,
}
