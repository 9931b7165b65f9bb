//! Generation settings — stop sequences and token cap for each turn.

use pocketllm_domain::{CompletionRequest, DEFAULT_STOP_SEQUENCES, DEFAULT_TOKEN_LIMIT, Message};
use serde::{Deserialize, Serialize};

/// Per-turn completion parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationSettings {
    /// Sequences that end the response when produced by the model.
    pub stop_sequences: Vec<String>,
    /// Maximum number of response tokens.
    pub token_limit: usize,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            stop_sequences: DEFAULT_STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

impl GenerationSettings {
    pub fn with_token_limit(mut self, limit: usize) -> Self {
        self.token_limit = limit;
        self
    }

    pub fn with_stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.stop_sequences = stops;
        self
    }

    /// Build the completion request for the given history.
    pub fn request_for(&self, history: Vec<Message>) -> CompletionRequest {
        CompletionRequest::new(history, self.stop_sequences.clone(), self.token_limit)
    }
}
