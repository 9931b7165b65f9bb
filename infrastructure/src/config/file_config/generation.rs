//! Generation configuration from TOML (`[generation]` section)

use super::ConfigValidationError;
use pocketllm_application::GenerationSettings;
use serde::{Deserialize, Serialize};

/// Raw generation configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileGenerationConfig {
    /// Maximum number of response tokens
    pub token_limit: usize,
    /// Sequences that end a response
    pub stop_sequences: Vec<String>,
}

impl Default for FileGenerationConfig {
    fn default() -> Self {
        let defaults = GenerationSettings::default();
        Self {
            token_limit: defaults.token_limit,
            stop_sequences: defaults.stop_sequences,
        }
    }
}

impl FileGenerationConfig {
    pub fn to_settings(&self) -> GenerationSettings {
        GenerationSettings::default()
            .with_token_limit(self.token_limit)
            .with_stop_sequences(self.stop_sequences.clone())
    }

    pub(super) fn validate(&self) -> Vec<ConfigValidationError> {
        let mut issues = Vec::new();
        if self.token_limit == 0 {
            issues.push(ConfigValidationError::ZeroTokenLimit);
        }
        if self.stop_sequences.iter().any(|s| s.is_empty()) {
            issues.push(ConfigValidationError::EmptyStopSequence);
        }
        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_settings() {
        let config = FileGenerationConfig {
            token_limit: 256,
            stop_sequences: vec!["<|im_end|>".to_string()],
        };
        let settings = config.to_settings();
        assert_eq!(settings.token_limit, 256);
        assert_eq!(settings.stop_sequences, vec!["<|im_end|>"]);
    }
}
