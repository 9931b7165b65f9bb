//! Session observer port
//!
//! Live-update callbacks from the session controller to the UI layer.
//! Implementations live in the presentation layer.

use pocketllm_domain::{GenerationState, Message, ModelId};

/// Callback for live updates during a chat turn
///
/// All methods have no-op defaults so observers only implement what they
/// display. Callbacks run on the generating task and must not block.
pub trait SessionObserver: Send + Sync {
    /// Called on every state transition
    fn on_state_change(&self, _state: GenerationState) {}

    /// Called when the visible message list changes
    fn on_messages_changed(&self, _messages: &[Message]) {}

    /// Called before a model load starts
    fn on_model_loading(&self, _model_id: &ModelId) {}

    /// Called once the model is resident
    fn on_model_ready(&self, _model_id: &ModelId) {}

    /// Called for each accepted token with the accumulated partial response
    fn on_token(&self, _token: &str, _partial: &str) {}

    /// Called when the error slot is filled
    fn on_error(&self, _message: &str) {}
}

/// No-op observer for when live updates are not needed
pub struct NoSessionObserver;

impl SessionObserver for NoSessionObserver {}
