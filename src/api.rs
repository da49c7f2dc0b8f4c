//! HTTP facade
//!
//! Two routes delegating to the conversation manager, plus a version
//! endpoint. Pure plumbing; the contracts live in the manager.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::manager::ConversationManager;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConversationManager>,
}

impl AppState {
    pub fn new(manager: ConversationManager) -> Self {
        Self {
            manager: Arc::new(manager),
        }
    }
}
