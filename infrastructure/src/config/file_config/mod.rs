//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted to application settings on
//! demand.

mod generation;
mod paths;
mod runtime;

pub use generation::FileGenerationConfig;
pub use paths::{FileLoggingConfig, FileModelsConfig, FileStorageConfig};
pub use runtime::FileRuntimeConfig;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("generation.token_limit must be greater than 0")]
    ZeroTokenLimit,

    #[error("generation.stop_sequences cannot contain an empty string")]
    EmptyStopSequence,

    #[error("runtime.context_length must be greater than 0")]
    ZeroContextLength,

    #[error("runtime.load_timeout_seconds must be greater than 0")]
    ZeroLoadTimeout,

    #[error("runtime.server_binary cannot be empty")]
    EmptyServerBinary,
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Where conversations and the model manifest are stored
    pub storage: FileStorageConfig,
    /// Local model files
    pub models: FileModelsConfig,
    /// Inference server settings
    pub runtime: FileRuntimeConfig,
    /// Per-turn completion settings
    pub generation: FileGenerationConfig,
    /// Transcript logging
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        issues.extend(self.generation.validate());
        issues.extend(self.runtime.validate());
        issues
    }
}
