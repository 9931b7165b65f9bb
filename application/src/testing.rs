//! In-memory doubles for the application ports.

use crate::config::{GenerationSettings, RuntimeOptions};
use crate::ports::key_value_store::{KeyValueStore, StoreError};
use crate::ports::model_catalog::ModelCatalog;
use crate::ports::model_runtime::{ModelHandle, ModelRuntime, RuntimeError, StreamHandle};
use crate::ports::session_observer::SessionObserver;
use crate::services::conversation_repository::ConversationRepository;
use crate::services::runtime_host::RuntimeHost;
use crate::use_cases::session_controller::{SessionController, SessionError, TurnOutcome};
use async_trait::async_trait;
use pocketllm_domain::{CompletionRequest, Conversation, GenerationState, ModelId, StreamEvent};
use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) fn model(id: &str) -> ModelId {
    ModelId::new(id).unwrap()
}

/// Poll `condition` until it holds, failing the test after a few seconds.
pub(crate) async fn wait_until(condition: impl Fn() -> bool) {
    for _ in 0..2_500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    panic!("condition not reached in time");
}

// ==================== Store ====================

#[derive(Default)]
pub(crate) struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed(&self, key: &str, value: &str) {
        self.values
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }

    pub fn raw(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Read {
                key: key.to_string(),
                reason: "disk unavailable".to_string(),
            });
        }
        Ok(self.raw(key))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Write {
                key: key.to_string(),
                reason: "disk full".to_string(),
            });
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.seed(key, value);
        Ok(())
    }
}

// ==================== Catalog ====================

pub(crate) struct StaticCatalog {
    paths: HashMap<ModelId, PathBuf>,
}

impl StaticCatalog {
    pub fn with_models(ids: &[&str]) -> Self {
        let paths = ids
            .iter()
            .map(|id| (model(id), PathBuf::from(format!("/models/{}.gguf", id))))
            .collect();
        Self { paths }
    }
}

#[async_trait]
impl ModelCatalog for StaticCatalog {
    async fn resolve_local_path(&self, model_id: &ModelId) -> Option<PathBuf> {
        self.paths.get(model_id).cloned()
    }
}

// ==================== Runtime ====================

/// One step of a scripted completion
pub(crate) enum Step {
    Token(String),
    /// Block until the turn's cancellation token fires
    WaitForCancel,
    Fail(String),
}

impl Step {
    pub fn token(text: &str) -> Self {
        Step::Token(text.to_string())
    }
}

#[derive(Default)]
struct RuntimeLog {
    loads: Mutex<Vec<String>>,
    releases: Mutex<Vec<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    scripts: Mutex<VecDeque<Vec<Step>>>,
    load_attempts: AtomicUsize,
    fail_loads: AtomicBool,
}

/// Runtime whose completions replay queued scripts.
///
/// Without a queued script a completion answers `"ok"`.
pub(crate) struct ScriptedRuntime {
    log: Arc<RuntimeLog>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self {
            log: Arc::new(RuntimeLog::default()),
        }
    }

    pub fn push_script(&self, steps: Vec<Step>) {
        self.log.scripts.lock().unwrap().push_back(steps);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.log.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Calls to `load`, including failed ones
    pub fn load_attempts(&self) -> usize {
        self.log.load_attempts.load(Ordering::SeqCst)
    }

    /// Models loaded successfully
    pub fn loads(&self) -> Vec<String> {
        self.log.loads.lock().unwrap().clone()
    }

    pub fn releases(&self) -> Vec<String> {
        self.log.releases.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.log.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ModelRuntime for ScriptedRuntime {
    async fn load(
        &self,
        model_id: &ModelId,
        _path: &Path,
        _options: &RuntimeOptions,
    ) -> Result<Box<dyn ModelHandle>, RuntimeError> {
        self.log.load_attempts.fetch_add(1, Ordering::SeqCst);
        if self.log.fail_loads.load(Ordering::SeqCst) {
            return Err(RuntimeError::LoadFailed("out of memory".to_string()));
        }
        self.log.loads.lock().unwrap().push(model_id.to_string());
        Ok(Box::new(ScriptedHandle {
            model_id: model_id.clone(),
            log: self.log.clone(),
        }))
    }
}

struct ScriptedHandle {
    model_id: ModelId,
    log: Arc<RuntimeLog>,
}

#[async_trait]
impl ModelHandle for ScriptedHandle {
    fn model_id(&self) -> &ModelId {
        &self.model_id
    }

    async fn complete(
        &self,
        request: CompletionRequest,
        cancel: CancellationToken,
    ) -> Result<StreamHandle, RuntimeError> {
        self.log.requests.lock().unwrap().push(request);
        let steps = self
            .log
            .scripts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![Step::token("ok")]);

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            let mut text = String::new();
            for step in steps {
                match step {
                    Step::Token(token) => {
                        text.push_str(&token);
                        if tx.send(StreamEvent::Token(token)).await.is_err() {
                            return;
                        }
                    }
                    Step::WaitForCancel => cancel.cancelled().await,
                    Step::Fail(reason) => {
                        let _ = tx.send(StreamEvent::Error(reason)).await;
                        return;
                    }
                }
            }
            let _ = tx.send(StreamEvent::Completed(text)).await;
        });
        Ok(StreamHandle::new(rx))
    }

    async fn release(&self) -> Result<(), RuntimeError> {
        self.log.releases.lock().unwrap().push(self.model_id.to_string());
        Ok(())
    }
}

// ==================== Observer ====================

#[derive(Default)]
pub(crate) struct RecordingObserver {
    states: Mutex<Vec<GenerationState>>,
    tokens: Mutex<Vec<String>>,
    loading: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingObserver {
    pub fn states(&self) -> Vec<GenerationState> {
        self.states.lock().unwrap().clone()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }

    pub fn loading(&self) -> Vec<String> {
        self.loading.lock().unwrap().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }
}

impl SessionObserver for RecordingObserver {
    fn on_state_change(&self, state: GenerationState) {
        self.states.lock().unwrap().push(state);
    }

    fn on_model_loading(&self, model_id: &ModelId) {
        self.loading.lock().unwrap().push(model_id.to_string());
    }

    fn on_token(&self, token: &str, _partial: &str) {
        self.tokens.lock().unwrap().push(token.to_string());
    }

    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
}

// ==================== Controller fixture ====================

pub(crate) struct Fixture {
    pub store: Arc<MemoryStore>,
    pub runtime: Arc<ScriptedRuntime>,
    pub repository: Arc<ConversationRepository>,
    pub observer: Arc<RecordingObserver>,
    pub controller: Arc<SessionController>,
}

impl Fixture {
    pub fn new(models: &[&str]) -> Self {
        Self::with_settings(models, GenerationSettings::default())
    }

    pub fn with_settings(models: &[&str], settings: GenerationSettings) -> Self {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(ScriptedRuntime::new());
        let host = Arc::new(RuntimeHost::new(
            runtime.clone(),
            Arc::new(StaticCatalog::with_models(models)),
            RuntimeOptions::default(),
        ));
        let repository = Arc::new(ConversationRepository::new(store.clone()));
        let observer = Arc::new(RecordingObserver::default());
        let controller = Arc::new(
            SessionController::new(repository.clone(), host)
                .with_settings(settings)
                .with_observer(observer.clone()),
        );
        Self {
            store,
            runtime,
            repository,
            observer,
            controller,
        }
    }

    pub async fn open(&self, model_id: &str) -> Conversation {
        self.controller.open(&model(model_id)).await.unwrap()
    }

    /// A second repository over the same store, as after a restart.
    pub fn reopen(&self) -> ConversationRepository {
        ConversationRepository::new(self.store.clone())
    }

    pub fn spawn_send(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> JoinHandle<Result<TurnOutcome, SessionError>> {
        let controller = self.controller.clone();
        let conversation_id = conversation_id.to_string();
        let content = content.to_string();
        tokio::spawn(async move { controller.send_message(&conversation_id, &content).await })
    }
}
