//! Serialized form of the conversation collection.
//!
//! The whole collection is stored as one JSON array under a single key.
//! Field names follow the persisted layout (`modelId`, `createdAt`, ...).

use super::entities::Conversation;
use crate::core::error::DomainError;

/// Storage key holding the serialized conversation collection
pub const CONVERSATIONS_STORAGE_KEY: &str = "@local_ai_chat/conversations";

/// Serialize conversations, ordered by creation time for stable output.
pub fn encode_collection<'a, I>(conversations: I) -> Result<String, DomainError>
where
    I: IntoIterator<Item = &'a Conversation>,
{
    let mut records: Vec<&Conversation> = conversations.into_iter().collect();
    records.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    serde_json::to_string(&records).map_err(|e| DomainError::CorruptData(e.to_string()))
}

/// Parse a serialized collection. Blank input is an empty collection.
pub fn decode_collection(raw: &str) -> Result<Vec<Conversation>, DomainError> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_json::from_str(raw).map_err(|e| DomainError::CorruptData(e.to_string()))
}
