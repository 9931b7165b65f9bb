//! Streaming events for local model completions.
//!
//! [`StreamEvent`] represents individual events in a streaming completion,
//! enabling real-time display of model output as it's generated.

/// An event in a streaming completion.
///
/// Producers emit `Token`s in generation order and finish with exactly one
/// terminal event (`Completed` or `Error`). A closed channel without a
/// terminal event is treated as completion by the consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A text chunk from the model.
    Token(String),
    /// The complete response text (signals stream end).
    Completed(String),
    /// An error that occurred during generation.
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is a Token or Completed event.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Token(s) | StreamEvent::Completed(s) => Some(s),
            StreamEvent::Error(_) => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Completed(_) | StreamEvent::Error(_))
    }
}
