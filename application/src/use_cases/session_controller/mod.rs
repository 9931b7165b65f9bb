//! Session controller
//!
//! Drives one chat turn at a time against the resident model: appends the
//! user message, makes sure the model is loaded, streams the reply into a
//! scratch buffer and finalizes it as an assistant message. Also owns the
//! UI-facing snapshot (current conversation, partial response, error slot)
//! and pushes changes to a [`SessionObserver`].
//!
//! # Turn lifecycle
//!
//! ```text
//! Idle → Generating → Completed ─┐
//!                   → Cancelled ─┼→ Idle
//!                   → Failed ────┘
//! ```
//!
//! While a turn is in flight every further `send_message` is ignored. Tokens
//! that arrive after `cancel` are dropped; the partial response at the moment
//! of cancellation is kept with a stop marker.

mod editing;
mod types;

pub use types::{SessionError, TurnOutcome};

use crate::config::GenerationSettings;
use crate::ports::conversation_logger::{
    ConversationEvent, ConversationLogger, NoConversationLogger,
};
use crate::ports::model_runtime::{RuntimeError, StreamHandle};
use crate::ports::session_observer::{NoSessionObserver, SessionObserver};
use crate::services::conversation_repository::ConversationRepository;
use crate::services::runtime_host::RuntimeHost;
use pocketllm_domain::{
    Conversation, GenerationState, Message, ModelId, StreamEvent, UserInput, find_stop,
    stopped_response,
};
use serde_json::json;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use types::{ControllerState, StreamEnd, Turn};

/// Chat session controller
pub struct SessionController {
    repository: Arc<ConversationRepository>,
    runtime: Arc<RuntimeHost>,
    settings: GenerationSettings,
    observer: Arc<dyn SessionObserver>,
    conversation_logger: Arc<dyn ConversationLogger>,
    state: Mutex<ControllerState>,
}

impl SessionController {
    pub fn new(repository: Arc<ConversationRepository>, runtime: Arc<RuntimeHost>) -> Self {
        Self {
            repository,
            runtime,
            settings: GenerationSettings::default(),
            observer: Arc::new(NoSessionObserver),
            conversation_logger: Arc::new(NoConversationLogger),
            state: Mutex::new(ControllerState::default()),
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn SessionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.conversation_logger = logger;
        self
    }

    // ==================== Snapshot accessors ====================

    pub fn state(&self) -> GenerationState {
        self.lock().phase
    }

    pub fn is_generating(&self) -> bool {
        self.lock().phase == GenerationState::Generating
    }

    pub fn model_id(&self) -> Option<ModelId> {
        self.lock().model_id.clone()
    }

    pub fn conversation(&self) -> Option<Conversation> {
        self.lock().conversation.clone()
    }

    pub fn current_conversation_id(&self) -> Option<String> {
        self.lock().conversation.as_ref().map(|c| c.id.clone())
    }

    pub fn messages(&self) -> Vec<Message> {
        self.lock()
            .conversation
            .as_ref()
            .map(|c| c.messages().to_vec())
            .unwrap_or_default()
    }

    /// Text streamed so far in the current turn
    pub fn partial_response(&self) -> String {
        self.lock().scratch.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    // ==================== Turn ====================

    /// Send a user message and stream the model's reply.
    ///
    /// Blank input, or input arriving while another turn is in flight, is
    /// ignored. The user message is kept even when the model fails to load
    /// or to generate.
    pub async fn send_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<TurnOutcome, SessionError> {
        let Some(input) = UserInput::try_new(content) else {
            debug!("Ignoring blank message");
            return Ok(TurnOutcome::Ignored);
        };

        let mut guard = {
            let mut state = self.lock();
            if state.phase.is_busy() {
                debug!(phase = %state.phase, "Turn in flight, ignoring message");
                return Ok(TurnOutcome::Ignored);
            }
            let (settled_tx, settled_rx) = watch::channel(false);
            let cancel = CancellationToken::new();
            state.transition(GenerationState::Generating);
            state.scratch.clear();
            state.error = None;
            state.turn = Some(Turn {
                conversation_id: conversation_id.to_string(),
                cancel: cancel.clone(),
                settled: settled_rx,
            });
            TurnGuard {
                controller: self,
                cancel,
                settled: settled_tx,
                finished: false,
            }
        };
        self.observer.on_state_change(GenerationState::Generating);

        let result = self.run_turn(conversation_id, input, &guard.cancel).await;
        let result = self.finish_turn(conversation_id, result);
        guard.finished = true;
        result
    }

    /// Stop the turn in flight.
    ///
    /// Returns `false` if nothing was generating. When it returns `true` the
    /// turn has been finalized, including the stopped partial response.
    pub async fn cancel(&self) -> bool {
        let mut settled = {
            let mut state = self.lock();
            if state.phase != GenerationState::Generating {
                debug!(phase = %state.phase, "Nothing to cancel");
                return false;
            }
            let Some(turn) = state.turn.as_ref() else {
                return false;
            };
            turn.cancel.cancel();
            let settled = turn.settled.clone();
            state.transition(GenerationState::Cancelled);
            settled
        };
        info!("Generation cancelled by user");
        self.observer.on_state_change(GenerationState::Cancelled);

        // `TurnGuard` sends the final value before the sender goes away.
        let _ = settled.wait_for(|done| *done).await;
        true
    }

    async fn run_turn(
        &self,
        conversation_id: &str,
        input: UserInput,
        cancel: &CancellationToken,
    ) -> Result<TurnOutcome, SessionError> {
        let user_message = Message::user(input.into_content());
        self.show_message(conversation_id, &user_message);
        let conversation = self
            .repository
            .append_message(conversation_id, user_message.clone())
            .await?;
        self.update_snapshot(&conversation);
        let model_id = conversation.model_id().clone();
        self.conversation_logger.log(ConversationEvent::new(
            "user_message",
            json!({
                "conversation_id": conversation_id,
                "model": model_id.as_str(),
                "content": user_message.content,
            }),
        ));

        let mut lease = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.finalize_cancelled(conversation_id).await,
            lease = self.runtime.lease() => lease,
        };

        let needs_load = !lease.is_resident(&model_id);
        if needs_load {
            self.observer.on_model_loading(&model_id);
        }
        let loaded = tokio::select! {
            biased;
            _ = cancel.cancelled() => return self.finalize_cancelled(conversation_id).await,
            loaded = lease.ensure_loaded(&model_id) => loaded.map_err(SessionError::from_load)?,
        };
        if loaded {
            self.conversation_logger.log(ConversationEvent::new(
                "model_loaded",
                json!({ "model": model_id.as_str() }),
            ));
        }
        if needs_load {
            self.observer.on_model_ready(&model_id);
        }

        let request = self.settings.request_for(conversation.messages().to_vec());
        let stream = match lease.complete(&model_id, request, cancel.clone()).await {
            Ok(stream) => stream,
            Err(RuntimeError::Cancelled) => return self.finalize_cancelled(conversation_id).await,
            Err(e) => return Err(SessionError::from_generation(e)),
        };
        let end = self.consume(stream, cancel).await;
        drop(lease);

        match end {
            StreamEnd::Completed(text) => self.finalize_completed(conversation_id, text).await,
            StreamEnd::Cancelled => self.finalize_cancelled(conversation_id).await,
            StreamEnd::Failed(_) if cancel.is_cancelled() => {
                self.finalize_cancelled(conversation_id).await
            }
            StreamEnd::Failed(reason) => Err(SessionError::GenerationFailure(reason)),
        }
    }

    async fn consume(&self, stream: StreamHandle, cancel: &CancellationToken) -> StreamEnd {
        let mut receiver = stream.receiver;
        let mut accepted = 0usize;
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return StreamEnd::Cancelled,
                event = receiver.recv() => event,
            };

            match event {
                Some(StreamEvent::Token(token)) => {
                    if !self.accept_token(cancel, &token) {
                        return StreamEnd::Cancelled;
                    }
                    accepted += 1;
                    if accepted >= self.settings.token_limit {
                        info!(limit = self.settings.token_limit, "Token limit reached");
                        return StreamEnd::Completed(String::new());
                    }
                }
                Some(StreamEvent::Completed(text)) => return StreamEnd::Completed(text),
                Some(StreamEvent::Error(reason)) => return StreamEnd::Failed(reason),
                None => return StreamEnd::Failed("stream closed before completion".to_string()),
            }
        }
    }

    /// Append a token to the scratch buffer unless the turn was cancelled.
    fn accept_token(&self, cancel: &CancellationToken, token: &str) -> bool {
        let partial = {
            let mut state = self.lock();
            if cancel.is_cancelled() || state.phase != GenerationState::Generating {
                return false;
            }
            state.scratch.push_str(token);
            state.scratch.clone()
        };
        self.observer.on_token(token, &partial);
        true
    }

    async fn finalize_completed(
        &self,
        conversation_id: &str,
        final_text: String,
    ) -> Result<TurnOutcome, SessionError> {
        // Claim the turn so a concurrent cancel becomes a no-op.
        let claimed = {
            let mut state = self.lock();
            if state.phase == GenerationState::Generating {
                state.transition(GenerationState::Completed);
                Some(std::mem::take(&mut state.scratch))
            } else {
                None
            }
        };
        let Some(streamed) = claimed else {
            return self.finalize_cancelled(conversation_id).await;
        };
        self.observer.on_state_change(GenerationState::Completed);

        let mut content = if streamed.trim().is_empty() {
            final_text
        } else {
            streamed
        };
        if let Some(at) = find_stop(&content, &self.settings.stop_sequences) {
            content.truncate(at);
        }
        let content = content.trim();
        if content.is_empty() {
            warn!("Model produced an empty response");
            return Ok(TurnOutcome::Completed { reply: None });
        }

        let reply = Message::assistant(content);
        self.show_message(conversation_id, &reply);
        let conversation = self
            .repository
            .append_message(conversation_id, reply.clone())
            .await?;
        self.update_snapshot(&conversation);
        self.conversation_logger.log(ConversationEvent::new(
            "assistant_message",
            json!({
                "conversation_id": conversation_id,
                "model": conversation.model_id().as_str(),
                "content": reply.content,
            }),
        ));
        Ok(TurnOutcome::Completed { reply: Some(reply) })
    }

    async fn finalize_cancelled(&self, conversation_id: &str) -> Result<TurnOutcome, SessionError> {
        let partial = std::mem::take(&mut self.lock().scratch);
        self.conversation_logger.log(ConversationEvent::new(
            "generation_cancelled",
            json!({
                "conversation_id": conversation_id,
                "partial_chars": partial.chars().count(),
            }),
        ));
        if partial.trim().is_empty() {
            return Ok(TurnOutcome::Cancelled { reply: None });
        }

        let reply = Message::assistant(stopped_response(&partial));
        self.show_message(conversation_id, &reply);
        let conversation = self
            .repository
            .append_message(conversation_id, reply.clone())
            .await?;
        self.update_snapshot(&conversation);
        Ok(TurnOutcome::Cancelled { reply: Some(reply) })
    }

    /// Record the outcome and return to `Idle`.
    fn finish_turn(
        &self,
        conversation_id: &str,
        result: Result<TurnOutcome, SessionError>,
    ) -> Result<TurnOutcome, SessionError> {
        let result = match result {
            Err(e) if e.is_cancelled() => Ok(TurnOutcome::Cancelled { reply: None }),
            other => other,
        };

        let mut transitions = Vec::with_capacity(2);
        {
            let mut state = self.lock();
            if state.phase == GenerationState::Generating {
                let outcome = match &result {
                    Ok(TurnOutcome::Completed { .. }) => GenerationState::Completed,
                    Ok(_) => GenerationState::Cancelled,
                    Err(_) => GenerationState::Failed,
                };
                state.transition(outcome);
                transitions.push(outcome);
            }
            if let Err(e) = &result {
                state.error = Some(e.to_string());
            }
            state.turn = None;
            state.scratch.clear();
            state.transition(GenerationState::Idle);
        }
        transitions.push(GenerationState::Idle);

        if let Err(e) = &result {
            error!(conversation = %conversation_id, "Chat turn failed: {}", e);
            self.conversation_logger.log(ConversationEvent::new(
                "generation_failed",
                json!({
                    "conversation_id": conversation_id,
                    "error": e.to_string(),
                }),
            ));
            self.observer.on_error(&e.to_string());
        }
        for state in transitions {
            self.observer.on_state_change(state);
        }
        result
    }

    // ==================== Snapshot helpers ====================

    fn lock(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Show a message in the open conversation before it is persisted.
    fn show_message(&self, conversation_id: &str, message: &Message) {
        let messages = {
            let mut state = self.lock();
            match state.conversation.as_mut() {
                Some(current) if current.id == conversation_id => {
                    current.push(message.clone());
                    current.messages().to_vec()
                }
                _ => return,
            }
        };
        self.observer.on_messages_changed(&messages);
    }

    /// Replace the open conversation with its stored version.
    fn update_snapshot(&self, conversation: &Conversation) {
        let changed = {
            let mut state = self.lock();
            match state.conversation.as_mut() {
                Some(current) if current.id == conversation.id => {
                    let changed = current.messages() != conversation.messages();
                    *current = conversation.clone();
                    changed
                }
                _ => false,
            }
        };
        if changed {
            self.observer.on_messages_changed(conversation.messages());
        }
    }

    /// Make `conversation` the open conversation.
    fn set_snapshot(&self, conversation: Conversation) {
        let messages = conversation.messages().to_vec();
        {
            let mut state = self.lock();
            state.model_id = Some(conversation.model_id().clone());
            state.conversation = Some(conversation);
        }
        self.observer.on_messages_changed(&messages);
    }

    fn set_error(&self, error: &SessionError) {
        let message = error.to_string();
        self.lock().error = Some(message.clone());
        self.observer.on_error(&message);
    }
}

/// Settles the turn however `send_message` ends.
///
/// If the future is dropped before the turn is finished, the engine is
/// cancelled, the partial response is discarded and the controller goes
/// back to `Idle`.
struct TurnGuard<'a> {
    controller: &'a SessionController,
    cancel: CancellationToken,
    settled: watch::Sender<bool>,
    finished: bool,
}

impl Drop for TurnGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.cancel.cancel();
            let entered = self.controller.lock().abandon_turn();
            if !entered.is_empty() {
                warn!("Turn dropped before it finished, partial response discarded");
                for state in entered {
                    self.controller.observer.on_state_change(state);
                }
            }
        }
        self.settled.send_replace(true);
    }
}
