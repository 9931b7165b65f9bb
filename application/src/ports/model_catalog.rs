//! Model catalog port
//!
//! The only contract the chat core needs from the model inventory.

use async_trait::async_trait;
use pocketllm_domain::ModelId;
use std::path::PathBuf;

/// Lookup of locally available model files
#[async_trait]
pub trait ModelCatalog: Send + Sync {
    /// Path of the model file on this device, if present
    async fn resolve_local_path(&self, model_id: &ModelId) -> Option<PathBuf>;

    /// Whether the model can be loaded
    async fn is_available(&self, model_id: &ModelId) -> bool {
        self.resolve_local_path(model_id).await.is_some()
    }
}
