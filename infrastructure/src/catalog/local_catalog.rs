//! Manifest-backed catalog of local model files.
//!
//! The manifest is a JSON array of [`DownloadedModel`] records stored under
//! [`MODELS_STORAGE_KEY`]. Files dropped into the models directory resolve
//! even when they were never registered.

use async_trait::async_trait;
use pocketllm_application::ports::key_value_store::{KeyValueStore, StoreError};
use pocketllm_application::ports::model_catalog::ModelCatalog;
use pocketllm_domain::{DownloadedModel, MODELS_STORAGE_KEY, ModelId, now_millis};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur during catalog operations
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Model manifest is unreadable: {0}")]
    CorruptManifest(String),

    #[error("Not a usable model file name: {0}")]
    InvalidModel(String),

    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl CatalogError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        CatalogError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Catalog of model files on this machine
pub struct LocalModelCatalog {
    store: Arc<dyn KeyValueStore>,
    models_dir: PathBuf,
}

impl LocalModelCatalog {
    pub fn new(store: Arc<dyn KeyValueStore>, models_dir: impl Into<PathBuf>) -> Self {
        Self {
            store,
            models_dir: models_dir.into(),
        }
    }

    pub fn models_dir(&self) -> &Path {
        &self.models_dir
    }

    /// Registered models whose files still exist, sorted by name.
    ///
    /// Entries whose files have disappeared are dropped from the manifest.
    pub async fn list(&self) -> Result<Vec<DownloadedModel>, CatalogError> {
        let manifest = self.read_manifest().await?;
        let before = manifest.len();

        let mut present = Vec::with_capacity(before);
        for model in manifest {
            if file_exists(&model.local_path).await {
                present.push(model);
            } else {
                warn!(model = %model.id, path = %model.local_path.display(), "Model file missing, dropping entry");
            }
        }
        if present.len() != before {
            self.write_manifest(&present).await?;
        }

        present.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)));
        Ok(present)
    }

    /// Add a model file already on disk. The file name becomes the model id.
    ///
    /// Registering the same file name again replaces the earlier entry.
    pub async fn register(&self, path: &Path) -> Result<DownloadedModel, CatalogError> {
        let local_path = tokio::fs::canonicalize(path)
            .await
            .map_err(|e| CatalogError::io(path, e))?;
        let metadata = tokio::fs::metadata(&local_path)
            .await
            .map_err(|e| CatalogError::io(&local_path, e))?;
        if !metadata.is_file() {
            return Err(CatalogError::InvalidModel(local_path.display().to_string()));
        }

        let file_name = local_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let id = ModelId::new(&file_name).map_err(|_| CatalogError::InvalidModel(file_name.clone()))?;
        let name = local_path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());

        let model = DownloadedModel {
            id,
            name,
            local_path,
            size_bytes: metadata.len(),
            registered_at: now_millis(),
        };

        let mut manifest = self.read_manifest().await?;
        manifest.retain(|existing| existing.id != model.id);
        manifest.push(model.clone());
        self.write_manifest(&manifest).await?;

        info!(model = %model.id, size = %model.display_size(), "Registered model");
        Ok(model)
    }

    /// Remove a model from the manifest.
    ///
    /// The file itself is deleted only when it lives inside the models
    /// directory. Returns `false` if the model was not registered.
    pub async fn remove(&self, model_id: &ModelId) -> Result<bool, CatalogError> {
        let mut manifest = self.read_manifest().await?;
        let Some(index) = manifest.iter().position(|m| &m.id == model_id) else {
            return Ok(false);
        };
        let removed = manifest.remove(index);
        self.write_manifest(&manifest).await?;

        if self.is_managed(&removed.local_path) {
            match tokio::fs::remove_file(&removed.local_path).await {
                Ok(()) => info!(path = %removed.local_path.display(), "Deleted model file"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(CatalogError::io(&removed.local_path, e)),
            }
        }
        info!(model = %model_id, "Removed model");
        Ok(true)
    }

    fn is_managed(&self, path: &Path) -> bool {
        match std::fs::canonicalize(&self.models_dir) {
            Ok(dir) => path.starts_with(dir),
            Err(_) => path.starts_with(&self.models_dir),
        }
    }

    async fn read_manifest(&self) -> Result<Vec<DownloadedModel>, CatalogError> {
        match self.store.get(MODELS_STORAGE_KEY).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| CatalogError::CorruptManifest(e.to_string())),
            None => Ok(Vec::new()),
        }
    }

    async fn write_manifest(&self, models: &[DownloadedModel]) -> Result<(), CatalogError> {
        let raw = serde_json::to_string(models)
            .map_err(|e| CatalogError::CorruptManifest(e.to_string()))?;
        self.store.set(MODELS_STORAGE_KEY, &raw).await?;
        Ok(())
    }
}

#[async_trait]
impl ModelCatalog for LocalModelCatalog {
    async fn resolve_local_path(&self, model_id: &ModelId) -> Option<PathBuf> {
        match self.read_manifest().await {
            Ok(manifest) => {
                if let Some(model) = manifest.into_iter().find(|m| &m.id == model_id)
                    && file_exists(&model.local_path).await
                {
                    return Some(model.local_path);
                }
            }
            Err(e) => warn!("Could not read model manifest: {}", e),
        }

        let candidate = self.models_dir.join(model_id.as_str());
        file_exists(&candidate).await.then_some(candidate)
    }
}

async fn file_exists(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::FileKeyValueStore;

    struct Setup {
        _dir: tempfile::TempDir,
        root: PathBuf,
        catalog: LocalModelCatalog,
    }

    fn setup() -> Setup {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let store = Arc::new(FileKeyValueStore::new(root.join("data")));
        let models_dir = root.join("models");
        std::fs::create_dir_all(&models_dir).unwrap();
        Setup {
            _dir: dir,
            catalog: LocalModelCatalog::new(store, models_dir),
            root,
        }
    }

    fn write_model(path: &Path, bytes: usize) {
        std::fs::write(path, vec![0u8; bytes]).unwrap();
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let s = setup();
        let path = s.root.join("tiny-llama.Q4.gguf");
        write_model(&path, 2048);

        let model = s.catalog.register(&path).await.unwrap();

        assert_eq!(model.id.as_str(), "tiny-llama.Q4.gguf");
        assert_eq!(model.name, "tiny-llama.Q4");
        assert_eq!(model.size_bytes, 2048);
        let resolved = s.catalog.resolve_local_path(&model.id).await.unwrap();
        assert_eq!(resolved, std::fs::canonicalize(&path).unwrap());
        assert_eq!(s.catalog.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_register_twice_replaces_entry() {
        let s = setup();
        let path = s.root.join("a.gguf");
        write_model(&path, 1);
        s.catalog.register(&path).await.unwrap();
        write_model(&path, 4);
        s.catalog.register(&path).await.unwrap();

        let models = s.catalog.list().await.unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].size_bytes, 4);
    }

    #[tokio::test]
    async fn test_register_missing_file_fails() {
        let s = setup();
        let err = s.catalog.register(&s.root.join("nope.gguf")).await.unwrap_err();
        assert!(matches!(err, CatalogError::Io { .. }));
    }

    #[tokio::test]
    async fn test_unregistered_file_in_models_dir_resolves() {
        let s = setup();
        write_model(&s.catalog.models_dir().join("dropped.gguf"), 1);

        let id = ModelId::new("dropped.gguf").unwrap();
        assert!(s.catalog.is_available(&id).await);
        assert!(!s.catalog.is_available(&ModelId::new("other.gguf").unwrap()).await);
    }

    #[tokio::test]
    async fn test_list_drops_missing_files() {
        let s = setup();
        let keep = s.root.join("keep.gguf");
        let gone = s.root.join("gone.gguf");
        write_model(&keep, 1);
        write_model(&gone, 1);
        s.catalog.register(&keep).await.unwrap();
        s.catalog.register(&gone).await.unwrap();
        std::fs::remove_file(&gone).unwrap();

        let models = s.catalog.list().await.unwrap();

        assert_eq!(models.len(), 1);
        assert_eq!(models[0].id.as_str(), "keep.gguf");
    }

    #[tokio::test]
    async fn test_remove_deletes_only_managed_files() {
        let s = setup();
        let outside = s.root.join("outside.gguf");
        let inside = s.catalog.models_dir().join("inside.gguf");
        write_model(&outside, 1);
        write_model(&inside, 1);
        let outside_model = s.catalog.register(&outside).await.unwrap();
        let inside_model = s.catalog.register(&inside).await.unwrap();

        assert!(s.catalog.remove(&outside_model.id).await.unwrap());
        assert!(s.catalog.remove(&inside_model.id).await.unwrap());
        assert!(!s.catalog.remove(&inside_model.id).await.unwrap());

        assert!(outside.exists());
        assert!(!inside.exists());
        assert!(s.catalog.list().await.unwrap().is_empty());
    }
}
