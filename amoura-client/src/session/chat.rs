//! One open conversation view: timeline, listener, and the send path.
//!
//! The session owns its timeline and subscription; tearing the session down
//! releases both. Nothing here is a process-wide singleton — two sessions
//! over the same conversation would each hold their own state.

use std::sync::Arc;

use tokio::sync::Mutex;
use uuid::Uuid;

use shared::config::RealtimeConfig;
use shared::models::{ClientResult, Conversation, Message, NewMessage};

use crate::backend::{DataStore, Realtime};
use crate::services::{ConversationService, MessageService};

use super::listener::{ConversationListener, ListenerState};
use super::timeline::{MessageTimeline, TimelineEntry};

/// An open direct-message session between the local user and a peer.
pub struct ChatSession {
    conversation: Conversation,
    me: Uuid,
    peer: Uuid,
    messages: MessageService,
    timeline: Arc<Mutex<MessageTimeline>>,
    listener: ConversationListener,
}

impl ChatSession {
    /// Opens the conversation with `peer`, loading history and subscribing
    /// to live inserts.
    ///
    /// The conversation row is created if this is the first contact between
    /// the pair; both sides racing the first message still converge on one
    /// row.
    ///
    /// # Errors
    /// Returns a validation error for an invalid pair, and propagates
    /// backend failures from the upsert or the history fetch.
    pub async fn open(
        store: Arc<dyn DataStore>,
        realtime: Arc<dyn Realtime>,
        me: Uuid,
        peer: Uuid,
        config: RealtimeConfig,
    ) -> ClientResult<Self> {
        let conversations = ConversationService::new(store.clone());
        let messages = MessageService::new(store);

        let conversation = conversations.open(me, peer).await?;
        let history = messages.history(conversation.id).await?;

        let mut timeline = MessageTimeline::new(conversation.id);
        timeline.load(history);
        let timeline = Arc::new(Mutex::new(timeline));

        let listener = ConversationListener::spawn(realtime, timeline.clone(), config);

        Ok(Self {
            conversation,
            me,
            peer,
            messages,
            timeline,
            listener,
        })
    }

    /// The conversation this session displays.
    #[must_use]
    pub const fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    /// Sends a message: optimistic insert, then server confirmation.
    ///
    /// The timeline shows the entry immediately as pending. On confirmation
    /// the server row replaces it; on failure the entry flips to failed so
    /// the UI can offer retry or discard, and the error is returned.
    ///
    /// # Errors
    /// Propagates validation and backend errors from the append.
    pub async fn send(&self, body: impl Into<String>) -> ClientResult<Message> {
        self.send_reply(body, None).await
    }

    /// Sends a message replying to an earlier one.
    ///
    /// # Errors
    /// Propagates validation and backend errors from the append.
    pub async fn send_reply(
        &self,
        body: impl Into<String>,
        reply_to: Option<Uuid>,
    ) -> ClientResult<Message> {
        let draft = NewMessage {
            conversation_id: self.conversation.id,
            sender_id: self.me,
            recipient_id: self.peer,
            body: body.into(),
            reply_to,
        };

        let local_id = self.timeline.lock().await.append_local(&draft);

        match self.messages.send(draft).await {
            Ok(confirmed) => {
                // The realtime listener may already have merged this row;
                // reconcile is idempotent either way.
                self.timeline.lock().await.reconcile(confirmed.clone());
                Ok(confirmed)
            }
            Err(err) => {
                self.timeline.lock().await.mark_failed(local_id);
                Err(err)
            }
        }
    }

    /// Marks a peer message as read.
    ///
    /// # Errors
    /// Propagates backend failures from the update.
    pub async fn mark_read(&self, message_id: Uuid) -> ClientResult<Message> {
        self.messages.mark_read(message_id).await
    }

    /// A snapshot of the displayed entries, in display order.
    pub async fn snapshot(&self) -> Vec<TimelineEntry> {
        self.timeline.lock().await.entries().to_vec()
    }

    /// Discards a failed entry the user gave up on.
    pub async fn discard_failed(&self, local_id: Uuid) -> bool {
        self.timeline.lock().await.discard_failed(local_id)
    }

    /// Current realtime listener state.
    #[must_use]
    pub fn listener_state(&self) -> ListenerState {
        self.listener.state()
    }

    /// A watch handle for observing listener state transitions.
    #[must_use]
    pub fn watch_listener(&self) -> tokio::sync::watch::Receiver<ListenerState> {
        self.listener.watch_state()
    }

    /// Tears the session down, unsubscribing and cancelling any pending
    /// reconnect.
    pub async fn close(self) {
        self.listener.stop().await;
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("conversation_id", &self.conversation.id)
            .field("me", &self.me)
            .field("peer", &self.peer)
            .finish_non_exhaustive()
    }
}
