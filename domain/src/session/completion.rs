//! Completion request and stop handling

use crate::conversation::entities::Message;

/// Stop sequences covering the chat templates of the supported model families
pub const DEFAULT_STOP_SEQUENCES: [&str; 6] = [
    "</s>",
    "<|end|>",
    "user:",
    "assistant:",
    "<|im_end|>",
    "<|eot_id|>",
];

/// Response token cap; guarantees termination when no stop sequence is hit
pub const DEFAULT_TOKEN_LIMIT: usize = 10_000;

/// Marker appended to a partial response when the user stops generation
pub const STOPPED_BY_USER_MARKER: &str = "[Response stopped by user]";

/// A streaming completion request against the resident model (Value Object)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub stop_sequences: Vec<String>,
    pub token_limit: usize,
}

impl CompletionRequest {
    pub fn new(messages: Vec<Message>, stop_sequences: Vec<String>, token_limit: usize) -> Self {
        Self {
            messages,
            stop_sequences,
            token_limit,
        }
    }
}

/// Byte offset of the earliest stop sequence in `text`, if any.
pub fn find_stop(text: &str, stop_sequences: &[String]) -> Option<usize> {
    stop_sequences
        .iter()
        .filter(|s| !s.is_empty())
        .filter_map(|s| text.find(s.as_str()))
        .min()
}

/// Content of the assistant message finalized on user cancellation.
pub fn stopped_response(partial: &str) -> String {
    format!("{} {}", partial.trim_end(), STOPPED_BY_USER_MARKER)
}
