//! Type definitions for the session controller.

use crate::ports::model_runtime::RuntimeError;
use crate::services::conversation_repository::RepositoryError;
use pocketllm_domain::{Conversation, GenerationState, Message, ModelId};
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

/// Errors surfaced by session operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Failed to load model: {0}")]
    EngineLoadFailure(String),

    #[error("Generation failed: {0}")]
    GenerationFailure(String),

    #[error("Failed to save conversation: {0}")]
    PersistenceFailure(String),

    #[error("Response stopped by user")]
    UserCancelled,

    #[error("A response is still being generated")]
    Busy,

    #[error("No conversation is open")]
    NoConversation,
}

impl SessionError {
    /// Check if this error represents a cancellation
    pub fn is_cancelled(&self) -> bool {
        matches!(self, SessionError::UserCancelled)
    }

    pub(super) fn from_load(error: RuntimeError) -> Self {
        match error {
            RuntimeError::ModelUnavailable(id) => SessionError::NotFound(format!("model {}", id)),
            RuntimeError::Cancelled => SessionError::UserCancelled,
            other => SessionError::EngineLoadFailure(other.to_string()),
        }
    }

    pub(super) fn from_generation(error: RuntimeError) -> Self {
        match error {
            RuntimeError::Cancelled => SessionError::UserCancelled,
            RuntimeError::GenerationFailed(reason) => SessionError::GenerationFailure(reason),
            other => SessionError::GenerationFailure(other.to_string()),
        }
    }
}

impl From<RepositoryError> for SessionError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::NotFound(id) => SessionError::NotFound(format!("conversation {}", id)),
            RepositoryError::Persistence(e) => SessionError::PersistenceFailure(e.to_string()),
            RepositoryError::Corrupt(reason) => SessionError::PersistenceFailure(reason),
        }
    }
}

/// How a call to `send_message` ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Blank input, or another turn was already in flight
    Ignored,
    /// The engine finished. `None` when it produced no text.
    Completed { reply: Option<Message> },
    /// The user stopped generation. `reply` holds the finalized partial
    /// response, if any text had arrived.
    Cancelled { reply: Option<Message> },
}

impl TurnOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            TurnOutcome::Completed { reply } | TurnOutcome::Cancelled { reply } => reply.as_ref(),
            TurnOutcome::Ignored => None,
        }
    }
}

/// The turn currently in flight
pub(super) struct Turn {
    pub conversation_id: String,
    pub cancel: CancellationToken,
    /// Flips to `true` once the turn has been fully finalized
    pub settled: watch::Receiver<bool>,
}

/// Mutable controller state. Guarded by a synchronous mutex that is never
/// held across an await point.
#[derive(Default)]
pub(super) struct ControllerState {
    pub phase: GenerationState,
    pub model_id: Option<ModelId>,
    pub conversation: Option<Conversation>,
    pub turn: Option<Turn>,
    /// Tokens accepted so far in the current turn
    pub scratch: String,
    pub error: Option<String>,
}

impl ControllerState {
    pub fn is_turn_on(&self, conversation_id: &str) -> bool {
        self.phase.is_busy()
            && self
                .turn
                .as_ref()
                .is_some_and(|turn| turn.conversation_id == conversation_id)
    }

    /// Move to `next`, which must be a legal successor of the current phase.
    pub fn transition(&mut self, next: GenerationState) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "illegal transition {} -> {}",
            self.phase,
            next
        );
        self.phase = next;
    }

    /// Drop the turn in flight and settle back to `Idle`.
    ///
    /// A turn that never reached an outcome passes through `Cancelled`.
    /// Returns the states entered, empty if there was no turn.
    pub fn abandon_turn(&mut self) -> Vec<GenerationState> {
        if self.turn.take().is_none() {
            return Vec::new();
        }
        self.scratch.clear();
        let mut entered = Vec::with_capacity(2);
        if !self.phase.is_terminal() {
            self.transition(GenerationState::Cancelled);
            entered.push(GenerationState::Cancelled);
        }
        self.transition(GenerationState::Idle);
        entered.push(GenerationState::Idle);
        entered
    }
}

/// How the stream loop ended
pub(super) enum StreamEnd {
    Completed(String),
    Cancelled,
    Failed(String),
}
