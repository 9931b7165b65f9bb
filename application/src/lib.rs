//! Application layer for pocketllm
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod services;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::{GenerationSettings, RuntimeOptions};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    key_value_store::{KeyValueStore, StoreError},
    model_catalog::ModelCatalog,
    model_runtime::{ModelHandle, ModelRuntime, RuntimeError, StreamHandle},
    session_observer::{NoSessionObserver, SessionObserver},
};
pub use services::{
    conversation_repository::{ConversationRepository, RepositoryError},
    runtime_host::{RuntimeHost, RuntimeLease},
};
pub use use_cases::session_controller::{SessionController, SessionError, TurnOutcome};
