//! Runtime configuration from TOML (`[runtime]` section)

use super::ConfigValidationError;
use pocketllm_application::RuntimeOptions;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Raw inference server configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileRuntimeConfig {
    /// `llama-server` executable (name on PATH or absolute path)
    pub server_binary: String,
    /// Interface the server binds to
    pub host: String,
    /// Port the server listens on; 0 picks a free port
    pub port: u16,
    /// Context window in tokens
    pub context_length: u32,
    /// Layers offloaded to the GPU
    pub gpu_layers: u32,
    /// Lock model pages in RAM
    pub use_mlock: bool,
    /// How long to wait for the server to become healthy
    pub load_timeout_seconds: u64,
}

impl Default for FileRuntimeConfig {
    fn default() -> Self {
        let options = RuntimeOptions::default();
        Self {
            server_binary: "llama-server".to_string(),
            host: "127.0.0.1".to_string(),
            port: 0,
            context_length: options.context_length,
            gpu_layers: options.gpu_layers,
            use_mlock: options.use_mlock,
            load_timeout_seconds: 120,
        }
    }
}

impl FileRuntimeConfig {
    pub fn to_options(&self) -> RuntimeOptions {
        RuntimeOptions {
            context_length: self.context_length,
            gpu_layers: self.gpu_layers,
            use_mlock: self.use_mlock,
        }
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_secs(self.load_timeout_seconds)
    }

    pub(super) fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        if self.context_length == 0 {
            issues.push(ConfigValidationError::ZeroContextLength);
        }
        if self.load_timeout_seconds == 0 {
            issues.push(ConfigValidationError::ZeroLoadTimeout);
        }
        if self.server_binary.trim().is_empty() {
            issues.push(ConfigValidationError::EmptyServerBinary);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_options() {
        let config = FileRuntimeConfig::default();
        assert_eq!(config.to_options(), RuntimeOptions::default());
        assert_eq!(config.load_timeout(), Duration::from_secs(120));
    }
}
