//! Conversation domain.
//!
//! - [`entities::Conversation`] — an ordered message history bound to one model
//! - [`entities::Message`] — a single message within a conversation
//! - [`selection::select_active`] — which conversation is active for a model
//! - [`codec`] — the persisted JSON layout of the collection

pub mod codec;
pub mod entities;
pub mod selection;
pub mod user_input;
