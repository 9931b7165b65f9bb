//! Conversation repository — in-memory index over the persisted collection.
//!
//! The whole collection lives under [`CONVERSATIONS_STORAGE_KEY`]. It is read
//! once, lazily, on first use; every mutation rewrites the full collection
//! while still holding the write lock, so writes never interleave.

use crate::ports::key_value_store::{KeyValueStore, StoreError};
use crate::services::runtime_host::RuntimeHost;
use chrono::Local;
use pocketllm_domain::{
    CONVERSATIONS_STORAGE_KEY, Conversation, Message, ModelId, decode_collection,
    default_conversation_name, encode_collection, now_millis, select_active,
};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, error, info, warn};

const DAY_MILLIS: i64 = 24 * 60 * 60 * 1000;

/// Errors that can occur during repository operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("Conversation not found: {0}")]
    NotFound(String),

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("Stored conversations are unreadable: {0}")]
    Corrupt(String),
}

/// Keyed collection of conversations backed by a [`KeyValueStore`].
pub struct ConversationRepository {
    store: Arc<dyn KeyValueStore>,
    conversations: RwLock<HashMap<String, Conversation>>,
    initialized: OnceCell<()>,
    warm_loader: Option<Arc<RuntimeHost>>,
}

impl ConversationRepository {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            conversations: RwLock::new(HashMap::new()),
            initialized: OnceCell::new(),
            warm_loader: None,
        }
    }

    /// Pre-load the model in the background whenever an active conversation
    /// is resolved.
    pub fn with_warm_loader(mut self, host: Arc<RuntimeHost>) -> Self {
        self.warm_loader = Some(host);
        self
    }

    /// Load the persisted collection.
    ///
    /// Concurrent callers share a single read. A failed read leaves the
    /// repository uninitialized so the next call retries; nothing is ever
    /// written over a collection that could not be read.
    pub async fn initialize(&self) -> Result<(), RepositoryError> {
        self.initialized
            .get_or_try_init(|| async {
                let loaded = self.read_store().await?;
                *self.conversations.write().await = loaded;
                Ok::<(), RepositoryError>(())
            })
            .await
            .map(|_| ())
    }

    /// Most recently updated conversation for `model_id`, created if none
    /// exists.
    ///
    /// A failed write of a freshly created conversation is logged and the
    /// in-memory conversation is returned anyway.
    pub async fn get_or_create_active(
        &self,
        model_id: &ModelId,
    ) -> Result<Conversation, RepositoryError> {
        self.initialize().await?;

        let conversation = {
            let mut conversations = self.conversations.write().await;
            match select_active(conversations.values(), model_id) {
                Some(existing) => {
                    debug!(conversation = %existing.id, model = %model_id, "Resuming conversation");
                    existing.clone()
                }
                None => {
                    let created =
                        Conversation::new(model_id.clone(), default_conversation_name(&Local::now()));
                    info!(conversation = %created.id, model = %model_id, "Created conversation");
                    conversations.insert(created.id.clone(), created.clone());
                    if let Err(e) = self.persist(&conversations).await {
                        warn!("New conversation kept in memory only: {}", e);
                    }
                    created
                }
            }
        };

        self.spawn_warm_load(model_id);
        Ok(conversation)
    }

    pub async fn create(
        &self,
        model_id: ModelId,
        name: impl Into<String>,
    ) -> Result<Conversation, RepositoryError> {
        self.initialize().await?;
        let conversation = Conversation::new(model_id, name);
        let mut conversations = self.conversations.write().await;
        conversations.insert(conversation.id.clone(), conversation.clone());
        self.persist(&conversations).await?;
        info!(conversation = %conversation.id, "Created conversation");
        Ok(conversation)
    }

    /// Remove a conversation. Returns `false` if it did not exist.
    pub async fn delete(&self, id: &str) -> Result<bool, RepositoryError> {
        self.initialize().await?;
        let mut conversations = self.conversations.write().await;
        if conversations.remove(id).is_none() {
            return Ok(false);
        }
        self.persist(&conversations).await?;
        info!(conversation = %id, "Deleted conversation");
        Ok(true)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Conversation>, RepositoryError> {
        self.initialize().await?;
        Ok(self.conversations.read().await.get(id).cloned())
    }

    /// All conversations, most recently updated first.
    pub async fn get_all(&self) -> Result<Vec<Conversation>, RepositoryError> {
        self.initialize().await?;
        let mut all: Vec<Conversation> = self.conversations.read().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(all)
    }

    /// Replace the message list of an existing conversation.
    pub async fn update_messages(
        &self,
        id: &str,
        messages: Vec<Message>,
    ) -> Result<Conversation, RepositoryError> {
        self.modify(id, |conversation| conversation.replace_messages(messages))
            .await
    }

    pub async fn append_message(
        &self,
        id: &str,
        message: Message,
    ) -> Result<Conversation, RepositoryError> {
        self.modify(id, |conversation| conversation.push(message)).await
    }

    pub async fn rename(
        &self,
        id: &str,
        name: impl Into<String>,
    ) -> Result<Conversation, RepositoryError> {
        let name = name.into();
        self.modify(id, |conversation| conversation.rename(name)).await
    }

    /// Discard the in-memory index and re-read the store.
    pub async fn reload(&self) -> Result<(), RepositoryError> {
        self.initialize().await?;
        let mut conversations = self.conversations.write().await;
        *conversations = self.read_store().await?;
        Ok(())
    }

    /// Delete conversations not updated within the last `days` days.
    pub async fn prune_older_than(&self, days: u32) -> Result<usize, RepositoryError> {
        self.initialize().await?;
        let cutoff = now_millis() - i64::from(days) * DAY_MILLIS;
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|_, c| c.updated_at >= cutoff);
        let removed = before - conversations.len();
        if removed > 0 {
            self.persist(&conversations).await?;
            info!(removed, days, "Pruned old conversations");
        }
        Ok(removed)
    }

    async fn modify(
        &self,
        id: &str,
        change: impl FnOnce(&mut Conversation),
    ) -> Result<Conversation, RepositoryError> {
        self.initialize().await?;
        let mut conversations = self.conversations.write().await;
        let conversation = conversations
            .get_mut(id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        change(conversation);
        let updated = conversation.clone();
        self.persist(&conversations).await?;
        Ok(updated)
    }

    async fn read_store(&self) -> Result<HashMap<String, Conversation>, RepositoryError> {
        let loaded = match self.store.get(CONVERSATIONS_STORAGE_KEY).await? {
            Some(raw) => decode_collection(&raw).map_err(|e| {
                error!("Conversation store is corrupt: {}", e);
                RepositoryError::Corrupt(e.to_string())
            })?,
            None => Vec::new(),
        };
        info!(count = loaded.len(), "Loaded conversations");
        Ok(loaded.into_iter().map(|c| (c.id.clone(), c)).collect())
    }

    async fn persist(&self, conversations: &HashMap<String, Conversation>) -> Result<(), RepositoryError> {
        let raw = encode_collection(conversations.values())
            .map_err(|e| RepositoryError::Corrupt(e.to_string()))?;
        self.store
            .set(CONVERSATIONS_STORAGE_KEY, &raw)
            .await
            .map_err(|e| {
                error!("Failed to persist conversations: {}", e);
                RepositoryError::from(e)
            })
    }

    fn spawn_warm_load(&self, model_id: &ModelId) {
        let Some(host) = self.warm_loader.clone() else {
            return;
        };
        let model_id = model_id.clone();
        tokio::spawn(async move {
            if let Err(e) = host.warm(&model_id).await {
                warn!(model = %model_id, "Warm load failed: {}", e);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuntimeOptions;
    use crate::testing::{MemoryStore, ScriptedRuntime, StaticCatalog, model, wait_until};

    fn repository(store: &Arc<MemoryStore>) -> ConversationRepository {
        ConversationRepository::new(store.clone())
    }

    #[tokio::test]
    async fn test_get_or_create_active_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let first = repo.get_or_create_active(&model("m1")).await.unwrap();
        let second = repo.get_or_create_active(&model("m1")).await.unwrap();

        assert_eq!(first.id, second.id);
        assert!(first.name.starts_with("Chat - "));
        assert_eq!(repo.get_all().await.unwrap().len(), 1);
        assert!(store.raw(CONVERSATIONS_STORAGE_KEY).unwrap().contains(&first.id));
    }

    #[tokio::test]
    async fn test_active_conversation_is_most_recently_updated() {
        let store = Arc::new(MemoryStore::new());
        let mut older = Conversation::new(model("m1"), "older");
        older.updated_at += 5_000;
        let mut newer = Conversation::new(model("m1"), "newer");
        newer.updated_at += 1_000;
        let mut other = Conversation::new(model("m2"), "other");
        other.updated_at += 10_000;
        store.seed(
            CONVERSATIONS_STORAGE_KEY,
            &encode_collection([&older, &newer, &other]).unwrap(),
        );
        let repo = repository(&store);

        let active = repo.get_or_create_active(&model("m1")).await.unwrap();

        assert_eq!(active.id, older.id);
        assert_eq!(store.writes(), 0);
    }

    #[tokio::test]
    async fn test_initialize_reads_store_once() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let (a, b, c) = tokio::join!(repo.initialize(), repo.initialize(), repo.get_all());
        a.unwrap();
        b.unwrap();
        c.unwrap();

        assert_eq!(store.reads(), 1);
    }

    #[tokio::test]
    async fn test_failed_initial_read_is_retried() {
        let store = Arc::new(MemoryStore::new());
        store.fail_reads(true);
        let repo = repository(&store);

        let err = repo.get_or_create_active(&model("m1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Persistence(StoreError::Read { .. })));
        assert_eq!(store.writes(), 0);

        store.fail_reads(false);
        repo.get_or_create_active(&model("m1")).await.unwrap();
        assert_eq!(store.reads(), 2);
    }

    #[tokio::test]
    async fn test_corrupt_store_is_never_overwritten() {
        let store = Arc::new(MemoryStore::new());
        store.seed(CONVERSATIONS_STORAGE_KEY, "{not json");
        let repo = repository(&store);

        let err = repo.get_or_create_active(&model("m1")).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Corrupt(_)));
        assert_eq!(store.writes(), 0);
        assert_eq!(store.raw(CONVERSATIONS_STORAGE_KEY).unwrap(), "{not json");
    }

    #[tokio::test]
    async fn test_loads_persisted_conversations() {
        let store = Arc::new(MemoryStore::new());
        let id = {
            let repo = repository(&store);
            let conversation = repo.create(model("m1"), "saved").await.unwrap();
            repo.append_message(&conversation.id, Message::user("hi"))
                .await
                .unwrap();
            conversation.id
        };

        let repo = repository(&store);
        let loaded = repo.get_by_id(&id).await.unwrap().unwrap();
        assert_eq!(loaded.name, "saved");
        assert_eq!(loaded.messages()[0].content, "hi");
    }

    #[tokio::test]
    async fn test_update_unknown_conversation_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);

        let err = repo.update_messages("missing", Vec::new()).await.unwrap_err();
        assert_eq!(err, RepositoryError::NotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_update_refreshes_updated_at() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let conversation = repo.create(model("m1"), "chat").await.unwrap();

        let updated = repo
            .update_messages(&conversation.id, vec![Message::user("hi")])
            .await
            .unwrap();

        assert!(updated.updated_at >= conversation.updated_at);
        assert_eq!(updated.created_at, conversation.created_at);
        assert_eq!(updated.len(), 1);
    }

    #[tokio::test]
    async fn test_update_persistence_failure_propagates() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let conversation = repo.create(model("m1"), "chat").await.unwrap();

        store.fail_writes(true);
        let err = repo
            .update_messages(&conversation.id, vec![Message::user("hi")])
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::Persistence(StoreError::Write { .. })));
    }

    #[tokio::test]
    async fn test_create_write_failure_degrades_for_active() {
        let store = Arc::new(MemoryStore::new());
        store.fail_writes(true);
        let repo = repository(&store);

        let conversation = repo.get_or_create_active(&model("m1")).await.unwrap();
        assert!(repo.get_by_id(&conversation.id).await.unwrap().is_some());
        assert!(store.raw(CONVERSATIONS_STORAGE_KEY).is_none());
    }

    #[tokio::test]
    async fn test_delete_persists() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let conversation = repo.create(model("m1"), "chat").await.unwrap();

        assert!(repo.delete(&conversation.id).await.unwrap());
        assert!(!repo.delete(&conversation.id).await.unwrap());

        let reopened = repository(&store);
        assert!(reopened.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reload_picks_up_external_changes() {
        let store = Arc::new(MemoryStore::new());
        let repo = repository(&store);
        let other = repository(&store);

        repo.initialize().await.unwrap();
        let created = other.create(model("m1"), "elsewhere").await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_none());

        repo.reload().await.unwrap();
        assert!(repo.get_by_id(&created.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_prune_older_than() {
        let store = Arc::new(MemoryStore::new());
        let mut stale = Conversation::new(model("m1"), "stale");
        stale.created_at -= 40 * DAY_MILLIS;
        stale.updated_at -= 40 * DAY_MILLIS;
        let fresh = Conversation::new(model("m1"), "fresh");
        store.seed(
            CONVERSATIONS_STORAGE_KEY,
            &encode_collection([&stale, &fresh]).unwrap(),
        );
        let repo = repository(&store);

        assert_eq!(repo.prune_older_than(30).await.unwrap(), 1);
        let remaining = repo.get_all().await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, fresh.id);
        assert_eq!(repo.prune_older_than(30).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_warm_load_runs_in_background() {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(ScriptedRuntime::new());
        let host = Arc::new(RuntimeHost::new(
            runtime.clone(),
            Arc::new(StaticCatalog::with_models(&["m1"])),
            RuntimeOptions::default(),
        ));
        let repo = repository(&store).with_warm_loader(host.clone());

        repo.get_or_create_active(&model("m1")).await.unwrap();
        wait_until(|| !runtime.loads().is_empty()).await;

        assert_eq!(runtime.loads(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_warm_load_failure_is_swallowed() {
        let store = Arc::new(MemoryStore::new());
        let runtime = Arc::new(ScriptedRuntime::new());
        runtime.fail_loads(true);
        let host = Arc::new(RuntimeHost::new(
            runtime.clone(),
            Arc::new(StaticCatalog::with_models(&["m1"])),
            RuntimeOptions::default(),
        ));
        let repo = repository(&store).with_warm_loader(host.clone());

        let result = repo.get_or_create_active(&model("m1")).await;
        wait_until(|| runtime.load_attempts() == 1).await;

        let conversation = result.unwrap();
        assert_eq!(conversation.model_id(), &model("m1"));
        assert!(runtime.loads().is_empty());

        // The failed warm load leaves the slot free for the next turn.
        runtime.fail_loads(false);
        assert!(host.lease().await.ensure_loaded(&model("m1")).await.unwrap());
        assert_eq!(runtime.loads(), vec!["m1"]);
    }
}
