//! In-memory implementation of both collaborator contracts.
//!
//! Backs the test suites and the CLI's offline mode. Upsert conflict handling
//! and commit-time timestamp assignment follow the hosted service's semantics
//! so race and reconciliation tests exercise the real contract.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use shared::models::{
    ChangeEvent, ChangeFilter, ChangeOp, ClientError, ClientResult, Conversation, ConversationKey,
    Message, NewMessage, NewNotification, NewPost, NewTransaction, Notification, Post, Profile,
    ProfileUpdate, Timestamp, WalletTransaction, realtime::tables,
};

use super::{DataStore, Realtime, Subscription};

/// Control messages fanned out to subscribers.
#[derive(Debug, Clone)]
enum Signal {
    Change(ChangeEvent),
    /// Simulated channel failure: every live subscription ends.
    Disconnect,
}

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<Uuid, Profile>,
    posts: Vec<Post>,
    conversations: HashMap<Uuid, Conversation>,
    messages: Vec<Message>,
    notifications: Vec<Notification>,
    transactions: Vec<WalletTransaction>,
}

/// In-memory [`DataStore`] + [`Realtime`] backed by mutexed tables and a
/// broadcast fan-out.
#[derive(Debug)]
pub struct MemoryBackend {
    tables: Mutex<Tables>,
    events: broadcast::Sender<Signal>,
    failing_subscribes: AtomicU32,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            tables: Mutex::new(Tables::default()),
            events,
            failing_subscribes: AtomicU32::new(0),
        }
    }

    /// Creates a profile row the way the hosted auth collaborator would on
    /// sign-up.
    pub async fn seed_profile(&self, handle: &str) -> Profile {
        let now = Timestamp::now();
        let profile = Profile {
            id: Uuid::new_v4(),
            handle: handle.to_string(),
            display_name: None,
            bio: None,
            avatar_url: None,
            birthdate: None,
            interests: Vec::new(),
            is_verified: false,
            created_at: now,
            updated_at: now,
        };
        self.tables
            .lock()
            .await
            .profiles
            .insert(profile.id, profile.clone());
        profile
    }

    /// Delivers a raw change event to every live subscription.
    ///
    /// Tests use this to replay events out of order or with crafted rows.
    pub fn emit(&self, event: ChangeEvent) {
        let _ = self.events.send(Signal::Change(event));
    }

    /// Ends every live subscription, simulating a channel failure.
    pub fn disconnect_all(&self) {
        let _ = self.events.send(Signal::Disconnect);
    }

    /// Makes the next `count` subscribe calls fail, simulating a backend
    /// that refuses the channel.
    pub fn fail_next_subscribes(&self, count: u32) {
        self.failing_subscribes.store(count, Ordering::SeqCst);
    }

    fn broadcast(&self, table: &str, op: ChangeOp, record: &impl serde::Serialize) {
        if let Ok(record) = serde_json::to_value(record) {
            let _ = self.events.send(Signal::Change(ChangeEvent {
                table: table.to_string(),
                op,
                record,
            }));
        }
    }
}

#[async_trait]
impl DataStore for MemoryBackend {
    async fn fetch_profile(&self, user_id: Uuid) -> ClientResult<Profile> {
        self.tables
            .lock()
            .await
            .profiles
            .get(&user_id)
            .cloned()
            .ok_or(ClientError::NotFound { entity: "profile" })
    }

    async fn update_profile(&self, user_id: Uuid, update: ProfileUpdate) -> ClientResult<Profile> {
        let mut tables = self.tables.lock().await;
        let profile = tables
            .profiles
            .get_mut(&user_id)
            .ok_or(ClientError::NotFound { entity: "profile" })?;

        if let Some(display_name) = update.display_name {
            profile.display_name = Some(display_name);
        }
        if let Some(bio) = update.bio {
            profile.bio = Some(bio);
        }
        if let Some(avatar_url) = update.avatar_url {
            profile.avatar_url = Some(avatar_url);
        }
        if let Some(interests) = update.interests {
            profile.interests = interests;
        }
        profile.updated_at = Timestamp::now();

        Ok(profile.clone())
    }

    async fn list_profiles(&self) -> ClientResult<Vec<Profile>> {
        let tables = self.tables.lock().await;
        let mut profiles: Vec<Profile> = tables.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(profiles)
    }

    async fn insert_post(&self, draft: NewPost) -> ClientResult<Post> {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: draft.author_id,
            body: draft.body,
            media_url: draft.media_url,
            is_premium: draft.unlock_price_cents.is_some(),
            unlock_price_cents: draft.unlock_price_cents,
            like_count: 0,
            created_at: Timestamp::now(),
        };
        self.tables.lock().await.posts.push(post.clone());
        Ok(post)
    }

    async fn fetch_post(&self, post_id: Uuid) -> ClientResult<Post> {
        self.tables
            .lock()
            .await
            .posts
            .iter()
            .find(|post| post.id == post_id)
            .cloned()
            .ok_or(ClientError::NotFound { entity: "post" })
    }

    async fn list_posts(&self, _viewer_id: Uuid) -> ClientResult<Vec<Post>> {
        let tables = self.tables.lock().await;
        let mut posts = tables.posts.clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn increment_post_likes(&self, post_id: Uuid) -> ClientResult<Post> {
        let mut tables = self.tables.lock().await;
        let post = tables
            .posts
            .iter_mut()
            .find(|post| post.id == post_id)
            .ok_or(ClientError::NotFound { entity: "post" })?;
        post.like_count += 1;
        Ok(post.clone())
    }

    async fn upsert_conversation(&self, key: ConversationKey) -> ClientResult<Conversation> {
        let id = key.conversation_id();
        let mut tables = self.tables.lock().await;
        let conversation = tables.conversations.entry(id).or_insert_with(|| {
            let now = Timestamp::now();
            Conversation {
                id,
                participant_a: key.participant_a,
                participant_b: key.participant_b,
                created_at: now,
                updated_at: now,
            }
        });
        Ok(conversation.clone())
    }

    async fn touch_conversation(&self, conversation_id: Uuid, at: Timestamp) -> ClientResult<()> {
        let mut tables = self.tables.lock().await;
        let conversation = tables
            .conversations
            .get_mut(&conversation_id)
            .ok_or(ClientError::NotFound {
                entity: "conversation",
            })?;
        conversation.updated_at = at;
        Ok(())
    }

    async fn list_conversations(&self, user_id: Uuid) -> ClientResult<Vec<Conversation>> {
        let tables = self.tables.lock().await;
        let mut conversations: Vec<Conversation> = tables
            .conversations
            .values()
            .filter(|c| c.participant_a == user_id || c.participant_b == user_id)
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(conversations)
    }

    async fn insert_message(&self, draft: NewMessage) -> ClientResult<Message> {
        let mut tables = self.tables.lock().await;
        if !tables.conversations.contains_key(&draft.conversation_id) {
            return Err(ClientError::NotFound {
                entity: "conversation",
            });
        }

        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: draft.conversation_id,
            sender_id: draft.sender_id,
            recipient_id: draft.recipient_id,
            body: draft.body,
            reply_to: draft.reply_to,
            is_read: false,
            created_at: Timestamp::now(),
        };
        tables.messages.push(message.clone());
        drop(tables);

        self.broadcast(tables::MESSAGES, ChangeOp::Insert, &message);
        Ok(message)
    }

    async fn list_messages(&self, conversation_id: Uuid) -> ClientResult<Vec<Message>> {
        let tables = self.tables.lock().await;
        let mut messages: Vec<Message> = tables
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .cloned()
            .collect();
        messages.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(messages)
    }

    async fn mark_message_read(&self, message_id: Uuid) -> ClientResult<Message> {
        let mut tables = self.tables.lock().await;
        let message = tables
            .messages
            .iter_mut()
            .find(|m| m.id == message_id)
            .ok_or(ClientError::NotFound { entity: "message" })?;
        message.is_read = true;
        let message = message.clone();
        drop(tables);

        self.broadcast(tables::MESSAGES, ChangeOp::Update, &message);
        Ok(message)
    }

    async fn insert_notification(&self, draft: NewNotification) -> ClientResult<Notification> {
        let notification = Notification {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            kind: draft.kind,
            actor_id: draft.actor_id,
            reference_id: draft.reference_id,
            body: draft.body,
            is_read: false,
            created_at: Timestamp::now(),
        };
        self.tables
            .lock()
            .await
            .notifications
            .push(notification.clone());

        self.broadcast(tables::NOTIFICATIONS, ChangeOp::Insert, &notification);
        Ok(notification)
    }

    async fn list_notifications(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> ClientResult<Vec<Notification>> {
        let tables = self.tables.lock().await;
        let mut notifications: Vec<Notification> = tables
            .notifications
            .iter()
            .filter(|n| n.user_id == user_id && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        notifications.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(notifications)
    }

    async fn mark_notification_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        let mut tables = self.tables.lock().await;
        let notification = tables
            .notifications
            .iter_mut()
            .find(|n| n.id == notification_id)
            .ok_or(ClientError::NotFound {
                entity: "notification",
            })?;
        notification.is_read = true;
        Ok(notification.clone())
    }

    async fn insert_transaction(&self, draft: NewTransaction) -> ClientResult<WalletTransaction> {
        let transaction = WalletTransaction {
            id: Uuid::new_v4(),
            user_id: draft.user_id,
            kind: draft.kind,
            amount_cents: draft.amount_cents,
            reference_id: draft.reference_id,
            created_at: Timestamp::now(),
        };
        self.tables
            .lock()
            .await
            .transactions
            .push(transaction.clone());
        Ok(transaction)
    }

    async fn list_transactions(&self, user_id: Uuid) -> ClientResult<Vec<WalletTransaction>> {
        let tables = self.tables.lock().await;
        let mut transactions: Vec<WalletTransaction> = tables
            .transactions
            .iter()
            .filter(|t| t.user_id == user_id)
            .cloned()
            .collect();
        transactions.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));
        Ok(transactions)
    }
}

#[async_trait]
impl Realtime for MemoryBackend {
    async fn subscribe(&self, filter: ChangeFilter) -> ClientResult<Subscription> {
        let failing = self.failing_subscribes.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_subscribes.store(failing - 1, Ordering::SeqCst);
            return Err(ClientError::subscription("subscribe refused"));
        }

        let mut receiver = self.events.subscribe();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let stream = async_stream::stream! {
            loop {
                let received = tokio::select! {
                    () = token.cancelled() => break,
                    received = receiver.recv() => received,
                };
                match received {
                    Ok(Signal::Change(event)) => {
                        if filter.matches(&event) {
                            yield event;
                        }
                    }
                    Ok(Signal::Disconnect) | Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => {}
                }
            }
        };

        Ok(Subscription::new(Box::pin(stream), cancel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    fn key_for(a: Uuid, b: Uuid) -> ConversationKey {
        ConversationKey::new(a, b).unwrap()
    }

    #[tokio::test]
    async fn upsert_is_idempotent() {
        let backend = MemoryBackend::new();
        let a = backend.seed_profile("a").await.id;
        let b = backend.seed_profile("b").await.id;

        let first = backend.upsert_conversation(key_for(a, b)).await.unwrap();
        let second = backend.upsert_conversation(key_for(b, a)).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(backend.list_conversations(a).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn insert_message_requires_conversation() {
        let backend = MemoryBackend::new();
        let draft = NewMessage {
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            body: "hi".into(),
            reply_to: None,
        };

        assert!(matches!(
            backend.insert_message(draft).await,
            Err(ClientError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn inserted_messages_reach_matching_subscribers() {
        let backend = MemoryBackend::new();
        let a = backend.seed_profile("a").await.id;
        let b = backend.seed_profile("b").await.id;
        let conversation = backend.upsert_conversation(key_for(a, b)).await.unwrap();

        let mut subscription = backend
            .subscribe(ChangeFilter::conversation_messages(conversation.id))
            .await
            .unwrap();

        let sent = backend
            .insert_message(NewMessage {
                conversation_id: conversation.id,
                sender_id: a,
                recipient_id: b,
                body: "hello".into(),
                reply_to: None,
            })
            .await
            .unwrap();

        let event = subscription.next().await.unwrap();
        assert_eq!(event.message().unwrap(), sent);
    }

    #[tokio::test]
    async fn disconnect_ends_live_subscriptions() {
        let backend = MemoryBackend::new();
        let mut subscription = backend
            .subscribe(ChangeFilter::conversation_messages(Uuid::new_v4()))
            .await
            .unwrap();

        backend.disconnect_all();

        assert!(subscription.next().await.is_none());
    }

    #[tokio::test]
    async fn injected_subscribe_failures_are_consumed() {
        let backend = MemoryBackend::new();
        backend.fail_next_subscribes(1);

        let filter = ChangeFilter::conversation_messages(Uuid::new_v4());
        assert!(backend.subscribe(filter.clone()).await.is_err());
        assert!(backend.subscribe(filter).await.is_ok());
    }
}
