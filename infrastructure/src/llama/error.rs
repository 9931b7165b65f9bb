//! Error types for the llama-server adapter

use std::time::Duration;
use thiserror::Error;

/// Result type alias for llama-server operations
pub type Result<T> = std::result::Result<T, LlamaError>;

/// Errors that can occur when running or talking to llama-server
#[derive(Error, Debug)]
pub enum LlamaError {
    #[error("Failed to spawn llama-server: {0}")]
    SpawnError(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("llama-server exited during startup ({0})")]
    ExitedEarly(String),

    #[error("llama-server did not become ready within {0:?}")]
    LoadTimeout(Duration),

    #[error("llama-server returned {status}: {body}")]
    Status { status: u16, body: String },
}
