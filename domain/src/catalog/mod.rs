//! Local model inventory records

use crate::core::model::ModelId;
use crate::core::time::Timestamp;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Storage key holding the serialized model inventory
pub const MODELS_STORAGE_KEY: &str = "@local_ai_chat/models";

/// A model file present on this device (Entity)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownloadedModel {
    pub id: ModelId,
    pub name: String,
    pub local_path: PathBuf,
    pub size_bytes: u64,
    pub registered_at: Timestamp,
}

impl DownloadedModel {
    /// Human-readable size, e.g. `1.24 GB`
    pub fn display_size(&self) -> String {
        format_bytes(self.size_bytes)
    }
}

/// Format a byte count with binary units and two decimals.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["Bytes", "KB", "MB", "GB", "TB"];
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    let rounded = (value * 100.0).round() / 100.0;
    format!("{} {}", rounded, UNITS[unit])
}
