//! Conversation-level operations of the session controller: opening,
//! refreshing, clearing and editing the open conversation.

use super::{SessionController, SessionError};
use chrono::Local;
use pocketllm_domain::{Conversation, ModelId, default_conversation_name, without_turn};
use serde_json::json;
use tracing::{info, warn};

use crate::ports::conversation_logger::ConversationEvent;

impl SessionController {
    /// Open the active conversation for `model_id`, creating one if needed.
    pub async fn open(&self, model_id: &ModelId) -> Result<Conversation, SessionError> {
        if self.lock().phase.is_busy() {
            return Err(SessionError::Busy);
        }
        let conversation = self.repository.get_or_create_active(model_id).await?;
        info!(conversation = %conversation.id, model = %model_id, "Opened conversation");
        self.set_snapshot(conversation.clone());
        Ok(conversation)
    }

    /// Re-read `conversation_id` from the store.
    ///
    /// If the conversation no longer exists, falls back to the active
    /// conversation of the current model.
    pub async fn refresh(&self, conversation_id: &str) -> Result<Conversation, SessionError> {
        self.repository.reload().await?;
        let conversation = match self.repository.get_by_id(conversation_id).await? {
            Some(conversation) => conversation,
            None => {
                let model_id = self
                    .model_id()
                    .ok_or_else(|| SessionError::NotFound(format!("conversation {}", conversation_id)))?;
                warn!(conversation = %conversation_id, "Conversation vanished, reopening active one");
                self.repository.get_or_create_active(&model_id).await?
            }
        };
        self.set_snapshot(conversation.clone());
        Ok(conversation)
    }

    /// Delete the open conversation and start a fresh one for the same model.
    pub async fn clear_conversation(&self) -> Result<Conversation, SessionError> {
        let current = {
            let state = self.lock();
            if state.phase.is_busy() {
                return Err(SessionError::Busy);
            }
            state.conversation.clone()
        }
        .ok_or(SessionError::NoConversation)?;

        self.repository.delete(&current.id).await?;
        let fresh = self
            .repository
            .create(
                current.model_id().clone(),
                default_conversation_name(&Local::now()),
            )
            .await?;
        info!(old = %current.id, new = %fresh.id, "Cleared conversation");

        self.lock().error = None;
        self.set_snapshot(fresh.clone());
        Ok(fresh)
    }

    /// Delete a user message together with the assistant reply that follows it.
    ///
    /// Returns `Ok(false)` when the message is unknown or is not a user
    /// message. Rejected with [`SessionError::Busy`] while a turn is in flight
    /// on the same conversation.
    pub async fn delete_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> Result<bool, SessionError> {
        if self.lock().is_turn_on(conversation_id) {
            return Err(SessionError::Busy);
        }

        let conversation = self
            .repository
            .get_by_id(conversation_id)
            .await?
            .ok_or_else(|| SessionError::NotFound(format!("conversation {}", conversation_id)))?;

        let Some(remaining) = without_turn(conversation.messages(), message_id) else {
            warn!(
                conversation = %conversation_id,
                message = %message_id,
                "Only user messages can be deleted"
            );
            return Ok(false);
        };

        let removed = conversation.len() - remaining.len();
        let updated = self
            .repository
            .update_messages(conversation_id, remaining)
            .await?;
        info!(conversation = %conversation_id, removed, "Deleted message");
        self.conversation_logger.log(ConversationEvent::new(
            "message_deleted",
            json!({
                "conversation_id": conversation_id,
                "message_id": message_id,
                "removed": removed,
            }),
        ));
        self.update_snapshot(&updated);
        Ok(true)
    }

    /// Rename the open conversation.
    pub async fn rename(&self, name: &str) -> Result<Conversation, SessionError> {
        let name = name.trim();
        if name.is_empty() {
            return self.conversation().ok_or(SessionError::NoConversation);
        }
        let id = self
            .current_conversation_id()
            .ok_or(SessionError::NoConversation)?;
        let renamed = self.repository.rename(&id, name).await?;
        self.update_snapshot(&renamed);
        Ok(renamed)
    }

    /// Load the current model again after a failed load.
    pub async fn retry_load(&self) -> Result<(), SessionError> {
        let model_id = {
            let state = self.lock();
            if state.phase.is_busy() {
                return Err(SessionError::Busy);
            }
            state.model_id.clone()
        }
        .ok_or(SessionError::NoConversation)?;
        self.dismiss_error();

        let mut lease = self.runtime.lease().await;
        if !lease.is_resident(&model_id) {
            self.observer.on_model_loading(&model_id);
        }
        match lease.ensure_loaded(&model_id).await {
            Ok(loaded) => {
                if loaded {
                    self.conversation_logger.log(ConversationEvent::new(
                        "model_loaded",
                        json!({ "model": model_id.as_str() }),
                    ));
                }
                self.observer.on_model_ready(&model_id);
                Ok(())
            }
            Err(e) => {
                let error = SessionError::from_load(e);
                self.set_error(&error);
                Err(error)
            }
        }
    }

    pub fn dismiss_error(&self) {
        self.lock().error = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Fixture, Step, model, wait_until};
    use pocketllm_domain::Message;

    #[tokio::test]
    async fn test_delete_user_message_removes_reply() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;
        fx.controller.send_message(&conversation.id, "one").await.unwrap();
        fx.controller.send_message(&conversation.id, "two").await.unwrap();
        let first = fx.controller.messages()[0].clone();

        assert!(fx.controller.delete_message(&conversation.id, &first.id).await.unwrap());

        let contents: Vec<String> = fx
            .controller
            .messages()
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["two", "ok"]);
        let stored = fx.reopen().get_by_id(&conversation.id).await.unwrap().unwrap();
        assert_eq!(stored.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_lone_user_message() {
        let fx = Fixture::new(&["m1"]);
        fx.runtime.fail_loads(true);
        let conversation = fx.open("m1").await;
        let _ = fx.controller.send_message(&conversation.id, "stranded").await;
        let stranded = fx.controller.messages()[0].clone();

        assert!(fx
            .controller
            .delete_message(&conversation.id, &stranded.id)
            .await
            .unwrap());
        assert!(fx.controller.messages().is_empty());
    }

    #[tokio::test]
    async fn test_delete_assistant_message_is_rejected() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;
        fx.controller.send_message(&conversation.id, "hi").await.unwrap();
        let reply = fx.controller.messages()[1].clone();

        assert!(!fx.controller.delete_message(&conversation.id, &reply.id).await.unwrap());
        assert!(!fx.controller.delete_message(&conversation.id, "missing").await.unwrap());
        assert_eq!(fx.controller.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_delete_in_unknown_conversation_is_not_found() {
        let fx = Fixture::new(&["m1"]);

        let err = fx.controller.delete_message("missing", "x").await.unwrap_err();
        assert_eq!(err, SessionError::NotFound("conversation missing".to_string()));
    }

    #[tokio::test]
    async fn test_delete_during_generation_is_busy() {
        let fx = Fixture::new(&["m1"]);
        fx.runtime
            .push_script(vec![Step::token("a"), Step::WaitForCancel]);
        let conversation = fx.open("m1").await;
        let turn = fx.spawn_send(&conversation.id, "hi");
        wait_until(|| fx.controller.partial_response() == "a").await;
        let user = fx.controller.messages()[0].clone();

        let err = fx
            .controller
            .delete_message(&conversation.id, &user.id)
            .await
            .unwrap_err();
        assert_eq!(err, SessionError::Busy);

        fx.controller.cancel().await;
        turn.await.unwrap().unwrap();
        assert!(fx.controller.delete_message(&conversation.id, &user.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_refresh_picks_up_external_writes() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;
        fx.reopen()
            .append_message(&conversation.id, Message::user("from elsewhere"))
            .await
            .unwrap();

        let refreshed = fx.controller.refresh(&conversation.id).await.unwrap();

        assert_eq!(refreshed.len(), 1);
        assert_eq!(fx.controller.messages()[0].content, "from elsewhere");
    }

    #[tokio::test]
    async fn test_refresh_falls_back_when_conversation_vanished() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;
        fx.reopen().delete(&conversation.id).await.unwrap();

        let refreshed = fx.controller.refresh(&conversation.id).await.unwrap();

        assert_ne!(refreshed.id, conversation.id);
        assert_eq!(refreshed.model_id(), &model("m1"));
        assert_eq!(fx.controller.current_conversation_id(), Some(refreshed.id));
    }

    #[tokio::test]
    async fn test_clear_conversation_starts_fresh() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;
        fx.controller.send_message(&conversation.id, "hi").await.unwrap();

        let fresh = fx.controller.clear_conversation().await.unwrap();

        assert_ne!(fresh.id, conversation.id);
        assert!(fresh.is_empty());
        assert!(fx.controller.messages().is_empty());
        assert!(fx.repository.get_by_id(&conversation.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_without_conversation() {
        let fx = Fixture::new(&["m1"]);
        let err = fx.controller.clear_conversation().await.unwrap_err();
        assert_eq!(err, SessionError::NoConversation);
    }

    #[tokio::test]
    async fn test_rename() {
        let fx = Fixture::new(&["m1"]);
        let conversation = fx.open("m1").await;

        let renamed = fx.controller.rename("  Trip planning ").await.unwrap();

        assert_eq!(renamed.id, conversation.id);
        assert_eq!(renamed.name, "Trip planning");
        assert_eq!(fx.controller.conversation().unwrap().name, "Trip planning");
    }

    #[tokio::test]
    async fn test_retry_load_clears_error() {
        let fx = Fixture::new(&["m1"]);
        fx.runtime.fail_loads(true);
        let conversation = fx.open("m1").await;
        let _ = fx.controller.send_message(&conversation.id, "hi").await;
        assert!(fx.controller.error().is_some());

        assert!(fx.controller.retry_load().await.is_err());
        assert!(fx.controller.error().is_some());

        fx.runtime.fail_loads(false);
        fx.controller.retry_load().await.unwrap();
        assert!(fx.controller.error().is_none());
        assert_eq!(fx.runtime.loads(), vec!["m1"]);
    }

    #[tokio::test]
    async fn test_dismiss_error() {
        let fx = Fixture::new(&[]);
        let conversation = fx.open("m1").await;
        let _ = fx.controller.send_message(&conversation.id, "hi").await;
        assert!(fx.controller.error().is_some());

        fx.controller.dismiss_error();
        assert!(fx.controller.error().is_none());
    }
}
