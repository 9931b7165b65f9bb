//! Active-conversation selection policy.
//!
//! There is no stored "active" flag. For a given model, the active
//! conversation is the one most recently updated.

use super::entities::Conversation;
use crate::core::model::ModelId;
use chrono::{DateTime, TimeZone};

/// Select the active conversation for `model_id`.
///
/// Greatest `updated_at` wins; ties fall back to greatest `created_at` and
/// then to the id so the choice never depends on iteration order.
pub fn select_active<'a, I>(conversations: I, model_id: &ModelId) -> Option<&'a Conversation>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    conversations
        .into_iter()
        .filter(|c| c.model_id() == model_id)
        .max_by(|a, b| {
            a.updated_at
                .cmp(&b.updated_at)
                .then(a.created_at.cmp(&b.created_at))
                .then_with(|| a.id.cmp(&b.id))
        })
}

/// Name given to conversations created automatically, e.g. `Chat - Oct 15, 2026`.
pub fn default_conversation_name<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Chat - {}", now.format("%b %-d, %Y"))
}
