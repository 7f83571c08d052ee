//! Message management service layer.
//!
//! Appending a message assumes the conversation row already exists (callers
//! go through [`crate::services::ConversationService::open`] first). The
//! server assigns the message id and commit timestamp so ordering stays
//! consistent across clients; the conversation's activity timestamp is
//! bumped best-effort in the same logical operation.

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use shared::models::{ClientError, ClientResult, Message, NewMessage};

use crate::backend::DataStore;

/// Service for appending and reading direct messages.
#[derive(Clone)]
pub struct MessageService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl MessageService {
    /// Creates a new message service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Persists a new message and returns the server-confirmed row.
    ///
    /// # Arguments
    /// * `draft` - The message to append; the conversation must exist
    ///
    /// # Returns
    /// The stored row with its server-assigned id and commit timestamp.
    ///
    /// # Errors
    /// Returns a validation error for an empty body or nil identifiers, and
    /// propagates backend failures so the caller can mark its optimistic
    /// entry failed.
    pub async fn send(&self, draft: NewMessage) -> ClientResult<Message> {
        if draft.body.trim().is_empty() {
            return Err(ClientError::validation("message body must not be empty"));
        }
        if draft.sender_id.is_nil() || draft.recipient_id.is_nil() {
            return Err(ClientError::validation("message endpoints must not be nil"));
        }

        let message = self.store.insert_message(draft).await?;

        // Activity bump is best-effort; a failure here must not fail the
        // already-committed append.
        if let Err(err) = self
            .store
            .touch_conversation(message.conversation_id, message.created_at)
            .await
        {
            warn!(
                conversation_id = %message.conversation_id,
                error = %err,
                "failed to bump conversation activity"
            );
        }

        Ok(message)
    }

    /// Returns a conversation's messages ordered by commit timestamp.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn history(&self, conversation_id: Uuid) -> ClientResult<Vec<Message>> {
        self.store.list_messages(conversation_id).await
    }

    /// Marks a message as read.
    ///
    /// # Errors
    /// Returns an error if the message does not exist or the update fails.
    pub async fn mark_read(&self, message_id: Uuid) -> ClientResult<Message> {
        self.store.mark_message_read(message_id).await
    }
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::ConversationService;

    struct Fixture {
        messages: MessageService,
        conversations: ConversationService,
        a: Uuid,
        b: Uuid,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let a = backend.seed_profile("a").await.id;
        let b = backend.seed_profile("b").await.id;
        Fixture {
            messages: MessageService::new(backend.clone()),
            conversations: ConversationService::new(backend),
            a,
            b,
        }
    }

    fn draft(fixture: &Fixture, conversation_id: Uuid, body: &str) -> NewMessage {
        NewMessage {
            conversation_id,
            sender_id: fixture.a,
            recipient_id: fixture.b,
            body: body.into(),
            reply_to: None,
        }
    }

    #[tokio::test]
    async fn send_returns_server_assigned_identity() {
        let fx = fixture().await;
        let conversation = fx.conversations.open(fx.a, fx.b).await.unwrap();

        let message = fx
            .messages
            .send(draft(&fx, conversation.id, "hello"))
            .await
            .unwrap();

        assert!(!message.id.is_nil());
        assert_eq!(message.conversation_id, conversation.id);
        assert!(!message.is_read);
    }

    #[tokio::test]
    async fn send_bumps_conversation_activity() {
        let fx = fixture().await;
        let conversation = fx.conversations.open(fx.a, fx.b).await.unwrap();

        let message = fx
            .messages
            .send(draft(&fx, conversation.id, "ping"))
            .await
            .unwrap();

        let listed = fx.conversations.list_for(fx.a).await.unwrap();
        assert_eq!(listed[0].updated_at, message.created_at);
    }

    #[tokio::test]
    async fn empty_body_is_rejected_before_any_call() {
        let fx = fixture().await;
        let conversation = fx.conversations.open(fx.a, fx.b).await.unwrap();

        let result = fx.messages.send(draft(&fx, conversation.id, "   ")).await;

        assert!(matches!(result, Err(ClientError::Validation { .. })));
        assert!(fx.messages.history(conversation.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_is_ordered_by_commit_time() {
        let fx = fixture().await;
        let conversation = fx.conversations.open(fx.a, fx.b).await.unwrap();

        for body in ["one", "two", "three"] {
            fx.messages
                .send(draft(&fx, conversation.id, body))
                .await
                .unwrap();
        }

        let history = fx.messages.history(conversation.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert!(history.windows(2).all(|w| w[0].created_at <= w[1].created_at));
    }

    #[tokio::test]
    async fn mark_read_flips_the_flag() {
        let fx = fixture().await;
        let conversation = fx.conversations.open(fx.a, fx.b).await.unwrap();
        let message = fx
            .messages
            .send(draft(&fx, conversation.id, "read me"))
            .await
            .unwrap();

        let updated = fx.messages.mark_read(message.id).await.unwrap();

        assert!(updated.is_read);
        assert_eq!(updated.id, message.id);
    }
}
