//! Common types for language-model calls

/// Role of a transcript message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatRole {
    Human,
    Assistant,
}

/// One transcript entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn human(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Human,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// A completion request: the full transcript plus sampling options
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
}
