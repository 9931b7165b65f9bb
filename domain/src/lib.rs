//! Domain layer for pocketllm
//!
//! This crate contains the core entities and value objects of the local chat
//! client. It has no dependencies on infrastructure or presentation concerns.
//!
//! # Core Concepts
//!
//! - **Conversation**: an ordered, append-only message history bound to one
//!   local model. The most recently updated conversation of a model is its
//!   *active* conversation; activeness is derived, never stored.
//! - **Generation state**: each chat turn moves
//!   `Idle → Generating → {Completed | Cancelled | Failed} → Idle`.

pub mod catalog;
pub mod conversation;
pub mod core;
pub mod session;

// Re-export commonly used types
pub use catalog::{DownloadedModel, MODELS_STORAGE_KEY};
pub use conversation::{
    codec::{CONVERSATIONS_STORAGE_KEY, decode_collection, encode_collection},
    entities::{Conversation, Message, Role, without_turn},
    selection::{default_conversation_name, select_active},
    user_input::UserInput,
};
pub use core::{
    error::DomainError,
    model::ModelId,
    time::{Timestamp, now_millis},
};
pub use session::{
    completion::{
        CompletionRequest, DEFAULT_STOP_SEQUENCES, DEFAULT_TOKEN_LIMIT, STOPPED_BY_USER_MARKER,
        find_stop, stopped_response,
    },
    state::GenerationState,
    stream::StreamEvent,
};
