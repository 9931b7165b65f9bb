//! Conversation domain entities

use crate::core::model::ModelId;
use crate::core::time::{Timestamp, now_millis};
use serde::{Deserialize, Serialize};

/// Role of a message in a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A message in a conversation (Entity)
///
/// Messages are immutable once created. They leave a conversation only
/// through pair deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    pub timestamp: Timestamp,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            role,
            content: content.into(),
            timestamp: now_millis(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn is_assistant(&self) -> bool {
        self.role == Role::Assistant
    }
}

/// A conversation with a single local model (Entity)
///
/// `model_id` never changes after creation. Every mutation goes through a
/// method that refreshes `updated_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    model_id: ModelId,
    pub name: String,
    messages: Vec<Message>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Conversation {
    pub fn new(model_id: ModelId, name: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            model_id,
            name: name.into(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
        self.touch();
    }

    /// Replace the whole message list (used by edit/delete paths).
    pub fn replace_messages(&mut self, messages: Vec<Message>) {
        self.messages = messages;
        self.touch();
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    /// Refresh `updated_at`, never moving it backwards.
    pub fn touch(&mut self) {
        self.updated_at = self.updated_at.max(now_millis());
    }
}

/// Compute the message list after deleting a user turn.
///
/// Returns `None` when the message does not exist or is not a user message.
/// When the following message is an assistant reply, both are removed.
pub fn without_turn(messages: &[Message], message_id: &str) -> Option<Vec<Message>> {
    let index = messages.iter().position(|m| m.id == message_id)?;
    if !messages[index].is_user() {
        return None;
    }
    let remove_reply = messages
        .get(index + 1)
        .is_some_and(|next| next.is_assistant());
    let end = if remove_reply { index + 2 } else { index + 1 };

    let mut remaining = Vec::with_capacity(messages.len().saturating_sub(end - index));
    remaining.extend_from_slice(&messages[..index]);
    remaining.extend_from_slice(&messages[end..]);
    Some(remaining)
}

fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
