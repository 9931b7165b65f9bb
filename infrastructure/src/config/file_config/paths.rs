//! Filesystem locations from TOML (`[storage]`, `[models]`, `[logging]`)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "pocketllm";

/// Raw storage configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileStorageConfig {
    /// Directory for conversations and the model manifest
    pub data_dir: Option<String>,
}

impl FileStorageConfig {
    /// Resolved data directory (`$XDG_DATA_HOME/pocketllm` by default).
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_dir {
            Some(dir) => expand_home(dir),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR))
                .unwrap_or_else(|| PathBuf::from(".pocketllm")),
        }
    }
}

/// Raw model inventory configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileModelsConfig {
    /// Directory holding model files
    pub dir: Option<String>,
}

impl FileModelsConfig {
    /// Resolved models directory (`<data_dir>/models` by default).
    pub fn dir(&self, data_dir: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => expand_home(dir),
            None => data_dir.join("models"),
        }
    }
}

/// Raw logging configuration from TOML
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Write the JSONL chat transcript
    pub transcript: bool,
    /// Transcript directory (`<data_dir>/logs` by default)
    pub dir: Option<String>,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self {
            transcript: true,
            dir: None,
        }
    }
}

impl FileLoggingConfig {
    pub fn dir(&self, data_dir: &Path) -> PathBuf {
        match &self.dir {
            Some(dir) => expand_home(dir),
            None => data_dir.join("logs"),
        }
    }
}

/// Expand a leading `~/` to the home directory.
fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_models_dir_defaults_under_data_dir() {
        let config = FileModelsConfig::default();
        assert_eq!(
            config.dir(Path::new("/data")),
            PathBuf::from("/data/models")
        );
    }

    #[test]
    fn test_explicit_paths_win() {
        let storage = FileStorageConfig {
            data_dir: Some("/srv/chat".to_string()),
        };
        assert_eq!(storage.data_dir(), PathBuf::from("/srv/chat"));

        let logging = FileLoggingConfig {
            transcript: true,
            dir: Some("/tmp/logs".to_string()),
        };
        assert_eq!(logging.dir(Path::new("/data")), PathBuf::from("/tmp/logs"));
    }

    #[test]
    fn test_expand_home() {
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/models"), home.join("models"));
        }
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
    }
}
