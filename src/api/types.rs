//! API request and response types

use serde::{Deserialize, Serialize};

/// Request to run one conversation turn
#[derive(Debug, Deserialize)]
pub struct PromptRequest {
    pub prompt: String,
}

/// Response for a completed turn
#[derive(Debug, Serialize)]
pub struct PromptResponse {
    pub human_message: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}
