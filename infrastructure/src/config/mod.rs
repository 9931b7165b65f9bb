//! Configuration file loading for pocketllm
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `POCKETLLM_*` environment variables (`__` separates sections)
//! 2. `--config <path>` specified file
//! 3. Project root: `./pocketllm.toml` or `./.pocketllm.toml`
//! 4. XDG config: `$XDG_CONFIG_HOME/pocketllm/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileGenerationConfig, FileLoggingConfig, FileModelsConfig,
    FileRuntimeConfig, FileStorageConfig,
};
pub use loader::ConfigLoader;
