//! Deterministic stub backend
//!
//! Returns queued replies in order. Selectable at startup for offline
//! runs, and the backend every conversation test drives.

use super::{CompletionRequest, DeltaHandler, LlmClient, LlmError};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

pub struct StubClient {
    responses: Mutex<VecDeque<Result<String, LlmError>>>,
    model_id: String,
    /// Record of all requests made
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl StubClient {
    pub fn new(model_id: impl Into<String>) -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            model_id: model_id.into(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a reply text
    pub fn queue_response(&self, text: impl Into<String>) {
        self.responses.lock().unwrap().push_back(Ok(text.into()));
    }

    /// Queue an error
    pub fn queue_error(&self, error: LlmError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Get recorded requests
    pub fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmClient for StubClient {
    async fn complete(
        &self,
        request: &CompletionRequest,
        _cancel: &CancellationToken,
        on_delta: Option<&DeltaHandler>,
    ) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());

        let next = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::unknown("no stub response queued")));

        if let (Ok(text), Some(handler)) = (&next, on_delta) {
            handler(text);
        }

        next
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
