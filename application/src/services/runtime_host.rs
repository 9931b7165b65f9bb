//! Runtime host — owner of the single resident model.
//!
//! At most one [`ModelHandle`] is resident at a time. Every load/complete
//! sequence runs under a [`RuntimeLease`], so a second caller waits until the
//! first has finished streaming before it can swap the model out.

use crate::config::RuntimeOptions;
use crate::ports::model_catalog::ModelCatalog;
use crate::ports::model_runtime::{ModelHandle, ModelRuntime, RuntimeError, StreamHandle};
use pocketllm_domain::{CompletionRequest, ModelId};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

type Slot = Option<Box<dyn ModelHandle>>;

/// Process-wide owner of the resident model runtime.
pub struct RuntimeHost {
    runtime: Arc<dyn ModelRuntime>,
    catalog: Arc<dyn ModelCatalog>,
    options: RuntimeOptions,
    resident: Mutex<Slot>,
}

impl RuntimeHost {
    pub fn new(
        runtime: Arc<dyn ModelRuntime>,
        catalog: Arc<dyn ModelCatalog>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            runtime,
            catalog,
            options,
            resident: Mutex::new(None),
        }
    }

    /// Wait for exclusive use of the runtime.
    pub async fn lease(&self) -> RuntimeLease<'_> {
        RuntimeLease {
            host: self,
            slot: self.resident.lock().await,
        }
    }

    /// Exclusive use of the runtime if nobody else holds it right now.
    pub fn try_lease(&self) -> Option<RuntimeLease<'_>> {
        self.resident.try_lock().ok().map(|slot| RuntimeLease { host: self, slot })
    }

    /// Load `model_id` ahead of the first message.
    ///
    /// Skipped when the runtime is busy; a turn in flight will load whatever
    /// model it needs itself.
    pub async fn warm(&self, model_id: &ModelId) -> Result<(), RuntimeError> {
        let Some(mut lease) = self.try_lease() else {
            debug!(model = %model_id, "Runtime busy, skipping warm load");
            return Ok(());
        };
        lease.ensure_loaded(model_id).await.map(|_| ())
    }

    /// Release the resident model, if any.
    pub async fn release(&self) -> Result<(), RuntimeError> {
        self.lease().await.release().await
    }
}

/// Exclusive access to the resident model slot.
pub struct RuntimeLease<'a> {
    host: &'a RuntimeHost,
    slot: MutexGuard<'a, Slot>,
}

impl RuntimeLease<'_> {
    pub fn is_resident(&self, model_id: &ModelId) -> bool {
        self.slot
            .as_ref()
            .is_some_and(|handle| handle.model_id() == model_id)
    }

    /// Make `model_id` the resident model.
    ///
    /// Returns `true` when a load actually happened. Any other resident model
    /// is released first.
    pub async fn ensure_loaded(&mut self, model_id: &ModelId) -> Result<bool, RuntimeError> {
        if self.is_resident(model_id) {
            return Ok(false);
        }

        let path = self
            .host
            .catalog
            .resolve_local_path(model_id)
            .await
            .ok_or_else(|| RuntimeError::ModelUnavailable(model_id.to_string()))?;

        if let Err(e) = self.release().await {
            warn!("Previous model did not release cleanly: {}", e);
        }

        info!(model = %model_id, path = %path.display(), "Loading model");
        let handle = self
            .host
            .runtime
            .load(model_id, &path, &self.host.options)
            .await?;
        *self.slot = Some(handle);
        info!(model = %model_id, "Model loaded");
        Ok(true)
    }

    /// Start a streaming completion against the resident model.
    ///
    /// Fails with [`RuntimeError::NotResident`] unless `model_id` is the
    /// resident model.
    pub async fn complete(
        &self,
        model_id: &ModelId,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, RuntimeError> {
        match self.slot.as_ref() {
            Some(handle) if handle.model_id() == model_id => handle.complete(request, cancel).await,
            Some(handle) => Err(RuntimeError::NotResident {
                requested: model_id.to_string(),
                resident: handle.model_id().to_string(),
            }),
            None => Err(RuntimeError::NotResident {
                requested: model_id.to_string(),
                resident: "none".to_string(),
            }),
        }
    }

    /// Release the resident model. The slot is emptied even if release fails.
    pub async fn release(&mut self) -> Result<(), RuntimeError> {
        match self.slot.take() {
            Some(handle) => {
                info!(model = %handle.model_id(), "Releasing model");
                handle.release().await
            }
            None => Ok(()),
        }
    }
}
