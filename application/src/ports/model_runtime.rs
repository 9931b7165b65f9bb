//! Model runtime port
//!
//! Defines how the application loads a local model and streams completions
//! from it. Adapters wrapping a concrete inference engine live in the
//! infrastructure layer.

use crate::config::RuntimeOptions;
use async_trait::async_trait;
use pocketllm_domain::{CompletionRequest, ModelId, StreamEvent};
use std::path::Path;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors that can occur during runtime operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Model not available: {0}")]
    ModelUnavailable(String),

    #[error("Failed to load model: {0}")]
    LoadFailed(String),

    #[error("Model {requested} is not resident (resident: {resident})")]
    NotResident { requested: String, resident: String },

    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    #[error("Failed to release model: {0}")]
    ReleaseFailed(String),

    #[error("Generation cancelled")]
    Cancelled,
}

/// Handle for receiving streaming events from a completion.
///
/// Wraps an `mpsc::Receiver<StreamEvent>`; events arrive in generation order.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }
}

/// Loader for local inference engines
#[async_trait]
pub trait ModelRuntime: Send + Sync {
    /// Load the model file at `path` and return a resident handle
    async fn load(
        &self,
        model_id: &ModelId,
        path: &Path,
        options: &RuntimeOptions,
    ) -> Result<Box<dyn ModelHandle>, RuntimeError>;
}

/// A loaded inference engine instance
#[async_trait]
pub trait ModelHandle: Send + Sync {
    /// The model this handle was loaded for
    fn model_id(&self) -> &ModelId;

    /// Start a streaming completion.
    ///
    /// The producer must stop emitting promptly once `cancel` fires; the
    /// consumer discards anything that still arrives afterwards.
    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, RuntimeError>;

    /// Release the engine and its memory
    async fn release(&self) -> Result<(), RuntimeError>;
}
