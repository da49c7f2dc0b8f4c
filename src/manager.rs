//! Conversation manager
//!
//! Owns the transcript and the in-memory neuron state, and drives one turn
//! at a time: prompt in, model call, fence strip, schema validation,
//! conditional state mutation, optional persistence, reply out.

use crate::db::{Store, StoreError};
use crate::llm::{ChatMessage, CompletionRequest, LlmClient, LlmError};
use crate::state::{NeuroState, NeuronUpdate, StateCommand};
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Placeholder in the seed-prompt template replaced once with the state's
/// canonical JSON form.
pub const STATE_PLACEHOLDER: &str = "{state}";

/// Sampling temperature for every turn. High on purpose: the agent is
/// meant to respond with creative variation, not determinism.
const TURN_TEMPERATURE: f32 = 1.0;

const FENCE_PREFIX: &str = "```json\n";
const FENCE_SUFFIX: &str = "\n```";

#[derive(Debug, Error)]
pub enum TurnError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("model reply violates the response schema: {0}")]
    ResponseFormat(#[source] serde_json::Error),
}

/// The model's reply, parsed against the fixed schema
#[derive(Debug, Deserialize)]
struct ModelReply {
    human_message: String,
    motor_neurons: Vec<NeuronUpdate>,
    sensory_neurons: Vec<NeuronUpdate>,
    changed: bool,
}

impl ModelReply {
    fn into_command(self) -> (String, StateCommand) {
        let command = if self.changed {
            StateCommand::Apply {
                motor: self.motor_neurons,
                sensory: self.sensory_neurons,
            }
        } else {
            StateCommand::NoChange
        };
        (self.human_message, command)
    }
}

pub struct ConversationManager {
    store: Store,
    llm: Arc<dyn LlmClient>,
    state: Mutex<NeuroState>,
    /// Every message exchanged with the model. The lock is held across a
    /// whole turn: transcript append order is part of correctness, so
    /// turns must never interleave.
    transcript: tokio::sync::Mutex<Vec<ChatMessage>>,
}

impl ConversationManager {
    /// Bootstrap from the most recent snapshot, or from the default
    /// catalog when the store is empty. Any other store failure is fatal.
    pub fn new(store: Store, llm: Arc<dyn LlmClient>, template: &str) -> Result<Self, StoreError> {
        let state = match store.latest_state() {
            Ok(state) => state,
            Err(StoreError::NoSnapshot) => {
                tracing::info!("No snapshot found, starting from the default catalog");
                NeuroState::with_default_catalog()
            }
            Err(e) => return Err(e),
        };

        let seed = template.replacen(STATE_PLACEHOLDER, &state.canonical_json(), 1);

        Ok(Self {
            store,
            llm,
            state: Mutex::new(state),
            transcript: tokio::sync::Mutex::new(vec![ChatMessage::human(seed)]),
        })
    }

    /// Current in-memory state snapshot. No I/O.
    pub fn state(&self) -> NeuroState {
        self.state.lock().unwrap().clone()
    }

    /// Run one turn against the model and return its reply for the human.
    pub async fn ask(&self, prompt: &str, cancel: &CancellationToken) -> Result<String, TurnError> {
        let mut transcript = self.transcript.lock().await;

        transcript.push(ChatMessage::human(prompt));

        let request = CompletionRequest {
            messages: transcript.clone(),
            temperature: TURN_TEMPERATURE,
            max_tokens: None,
        };
        let raw = self.llm.complete(&request, cancel, None).await?;

        let reply_text = strip_json_fence(&raw).to_string();

        // The assistant entry lands in the transcript even when it fails
        // to parse below; a bad turn is visible to the next one.
        transcript.push(ChatMessage::assistant(reply_text.clone()));

        let reply: ModelReply =
            serde_json::from_str(&reply_text).map_err(TurnError::ResponseFormat)?;
        let (human_message, command) = reply.into_command();

        match command {
            StateCommand::NoChange => {
                tracing::debug!("No neurons changed, skipping persistence");
            }
            StateCommand::Apply { motor, sensory } => {
                let snapshot = {
                    let mut state = self.state.lock().unwrap();
                    state.apply(&motor, &sensory);
                    state.clone()
                };

                // Two independent commits. A crash in between leaves a
                // snapshot with no prompt row; the snapshot log itself
                // stays consistent. A failure here is reported for this
                // turn only and the in-memory state is not rolled back.
                let snapshot_id = self.store.save_state(&snapshot)?;
                self.store.save_prompt(snapshot_id, prompt, &reply_text)?;

                tracing::info!(
                    snapshot_id,
                    state_count = snapshot.state_count,
                    motor = motor.len(),
                    sensory = sensory.len(),
                    "Applied neuron updates"
                );
            }
        }

        Ok(human_message)
    }

    #[cfg(test)]
    pub(crate) async fn transcript_snapshot(&self) -> Vec<ChatMessage> {
        self.transcript.lock().await.clone()
    }
}

/// Strip a literal ```json fence if the model wrapped its reply in one.
/// A plain prefix/suffix trim, not markdown parsing.
fn strip_json_fence(text: &str) -> &str {
    let text = text.strip_prefix(FENCE_PREFIX).unwrap_or(text);
    text.strip_suffix(FENCE_SUFFIX).unwrap_or(text)
}
