//! Backend collaborator contracts.
//!
//! The hosted backend-as-a-service owns auth, storage, and realtime delivery;
//! this module defines the seams the rest of the client talks through. The
//! trait surface is the contract — the REST and SSE implementations are
//! consumers of the hosted service, and the in-memory implementation backs
//! tests and offline use.

pub mod memory;
pub mod rest;
pub mod sse;

use std::pin::Pin;
use std::task::{Context, Poll};

use async_trait::async_trait;
use futures_util::Stream;
use futures_util::stream::BoxStream;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::models::{
    ChangeEvent, ChangeFilter, ClientResult, Conversation, ConversationKey, Message, NewMessage,
    NewNotification, NewPost, NewTransaction, Notification, Post, Profile, ProfileUpdate,
    Timestamp, WalletTransaction,
};

pub use memory::MemoryBackend;
pub use rest::RestDataStore;
pub use sse::SseRealtime;

/// Storage collaborator: pass-through CRUD against hosted tables.
///
/// Every method maps onto one of the hosted service's primitives —
/// insert-with-conflict-handling, select-by-key, select-by-filter-ordered,
/// update, delete — keyed by the primary identifiers of the shared models.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Fetches a profile by user id.
    async fn fetch_profile(&self, user_id: Uuid) -> ClientResult<Profile>;

    /// Applies a partial profile update and returns the stored row.
    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> ClientResult<Profile>;

    /// Lists profiles visible in discovery, newest first.
    async fn list_profiles(&self) -> ClientResult<Vec<Profile>>;

    /// Inserts a post; the server assigns id and commit timestamp.
    async fn insert_post(&self, draft: NewPost) -> ClientResult<Post>;

    /// Fetches a post by id.
    async fn fetch_post(&self, post_id: Uuid) -> ClientResult<Post>;

    /// Lists feed posts for a viewer, newest first.
    async fn list_posts(&self, viewer_id: Uuid) -> ClientResult<Vec<Post>>;

    /// Increments a post's like counter and returns the stored row.
    async fn increment_post_likes(&self, post_id: Uuid) -> ClientResult<Post>;

    /// Idempotent get-or-create keyed by the derived conversation id.
    ///
    /// Insert with conflict target = conversation id; on conflict the
    /// existing row is returned instead of an error, so concurrent calls
    /// from both participants converge on one row.
    async fn upsert_conversation(&self, key: ConversationKey) -> ClientResult<Conversation>;

    /// Bumps a conversation's `updated_at`.
    async fn touch_conversation(&self, conversation_id: Uuid, at: Timestamp) -> ClientResult<()>;

    /// Lists a user's conversations, most recently active first.
    async fn list_conversations(&self, user_id: Uuid) -> ClientResult<Vec<Conversation>>;

    /// Inserts a message; the server assigns id and commit timestamp.
    async fn insert_message(&self, draft: NewMessage) -> ClientResult<Message>;

    /// Lists a conversation's messages ordered by commit timestamp.
    async fn list_messages(&self, conversation_id: Uuid) -> ClientResult<Vec<Message>>;

    /// Marks a message read and returns the stored row.
    async fn mark_message_read(&self, message_id: Uuid) -> ClientResult<Message>;

    /// Inserts a notification row.
    async fn insert_notification(&self, draft: NewNotification) -> ClientResult<Notification>;

    /// Lists a user's notifications, newest first.
    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>>;

    /// Marks a notification read and returns the stored row.
    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification>;

    /// Appends a wallet ledger entry.
    async fn insert_transaction(&self, draft: NewTransaction) -> ClientResult<WalletTransaction>;

    /// Lists a user's ledger, oldest first.
    async fn list_transactions(&self, user_id: Uuid) -> ClientResult<Vec<WalletTransaction>>;
}

/// Realtime collaborator: change feeds over hosted tables.
#[async_trait]
pub trait Realtime: Send + Sync {
    /// Opens a change subscription.
    ///
    /// The returned future resolves only once the backend has acknowledged
    /// the channel; callers bound the wait with their own timeout and treat
    /// expiry as a channel error.
    async fn subscribe(&self, filter: ChangeFilter) -> ClientResult<Subscription>;
}

/// A live change subscription: a cancellable, non-restartable event stream.
///
/// The stream ends when the channel fails or the subscription is torn down;
/// resubscribing means asking the [`Realtime`] collaborator for a new one.
pub struct Subscription {
    events: BoxStream<'static, ChangeEvent>,
    cancel: CancellationToken,
}

impl Subscription {
    /// Wraps an event stream with its cancellation handle.
    #[must_use]
    pub fn new(events: BoxStream<'static, ChangeEvent>, cancel: CancellationToken) -> Self {
        Self { events, cancel }
    }

    /// Tears the subscription down and releases the channel resource.
    pub fn unsubscribe(self) {
        self.cancel.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        // Dropping without an explicit unsubscribe must not leak the channel.
        self.cancel.cancel();
    }
}

impl Stream for Subscription {
    type Item = ChangeEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.events).poll_next(cx)
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
