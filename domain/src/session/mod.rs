//! Chat session domain.
//!
//! - [`state::GenerationState`] — per-turn state machine
//! - [`stream::StreamEvent`] — ordered token events from the model
//! - [`completion::CompletionRequest`] — history, stop sequences and token cap

pub mod completion;
pub mod state;
pub mod stream;
