//! Engine initialization options passed to [`ModelRuntime::load`](crate::ports::model_runtime::ModelRuntime::load).

use serde::{Deserialize, Serialize};

/// Options used when loading a model into memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuntimeOptions {
    /// Context window in tokens.
    pub context_length: u32,
    /// Number of layers offloaded to the GPU.
    pub gpu_layers: u32,
    /// Lock model pages in RAM.
    pub use_mlock: bool,
}

impl Default for RuntimeOptions {
    fn default() -> Self {
        Self {
            context_length: 2048,
            gpu_layers: 1,
            use_mlock: true,
        }
    }
}
