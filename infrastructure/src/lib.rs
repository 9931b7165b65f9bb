//! Infrastructure layer for pocketllm
//!
//! This crate contains adapters that implement the ports defined
//! in the application layer, including configuration file loading.

pub mod catalog;
pub mod config;
pub mod llama;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use catalog::{CatalogError, LocalModelCatalog};
pub use config::{
    ConfigLoader, ConfigValidationError, FileConfig, FileGenerationConfig, FileLoggingConfig,
    FileModelsConfig, FileRuntimeConfig, FileStorageConfig,
};
pub use llama::{LlamaError, LlamaServerConfig, LlamaServerRuntime};
pub use logging::JsonlConversationLogger;
pub use storage::FileKeyValueStore;
