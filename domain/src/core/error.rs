//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Model id cannot be empty")]
    EmptyModelId,

    #[error("Invalid model id: {0}")]
    InvalidModelId(String),

    #[error("Corrupt conversation data: {0}")]
    CorruptData(String),
}
