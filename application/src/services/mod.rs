//! Long-lived services shared by the use cases.
//!
//! - [`ConversationRepository`](conversation_repository::ConversationRepository) — persisted conversation index
//! - [`RuntimeHost`](runtime_host::RuntimeHost) — owner of the resident model

pub mod conversation_repository;
pub mod runtime_host;
