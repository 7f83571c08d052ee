//! Post service layer.
//!
//! Free posts are plain CRUD. Premium posts are gated behind a one-time
//! unlock that debits the viewer's wallet and leaves a ledger entry keyed to
//! the post, which also makes the unlock idempotent.

use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use shared::models::{
    ClientError, ClientResult, NewNotification, NewPost, NewTransaction, NotificationKind, Post,
    TransactionKind, balance_cents,
};

use crate::backend::DataStore;

/// Service for publishing and consuming feed posts.
#[derive(Clone)]
pub struct PostService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl PostService {
    /// Creates a new post service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Publishes a post.
    ///
    /// # Errors
    /// Returns a validation error for an empty body or a non-positive unlock
    /// price, and propagates backend failures.
    pub async fn publish(&self, draft: NewPost) -> ClientResult<Post> {
        draft.validate()?;
        self.store.insert_post(draft).await
    }

    /// Lists the viewer's feed, newest first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn feed_for(&self, viewer_id: Uuid) -> ClientResult<Vec<Post>> {
        self.store.list_posts(viewer_id).await
    }

    /// Likes a post and notifies its author.
    ///
    /// # Errors
    /// Returns an error if the post does not exist or the counter bump
    /// fails; a failed notification insert is logged, not propagated.
    pub async fn like(&self, post_id: Uuid, liker_id: Uuid) -> ClientResult<Post> {
        let post = self.store.increment_post_likes(post_id).await?;

        if post.author_id != liker_id {
            let draft = NewNotification {
                user_id: post.author_id,
                kind: NotificationKind::PostLiked,
                actor_id: Some(liker_id),
                reference_id: Some(post.id),
                body: "Someone liked your post".into(),
            };
            if let Err(err) = self.store.insert_notification(draft).await {
                warn!(post_id = %post.id, error = %err, "failed to record like notification");
            }
        }

        Ok(post)
    }

    /// Unlocks a premium post for a viewer, debiting their wallet once.
    ///
    /// A repeated unlock of the same post is a no-op: the ledger entry keyed
    /// to the post is the unlock receipt.
    ///
    /// # Errors
    /// Returns a validation error if the wallet balance does not cover the
    /// price, a decode error for a premium post without a price, and
    /// propagates backend failures.
    pub async fn unlock(&self, post_id: Uuid, viewer_id: Uuid) -> ClientResult<Post> {
        let post = self.store.fetch_post(post_id).await?;
        if !post.is_premium || post.author_id == viewer_id {
            return Ok(post);
        }

        let Some(price) = post.unlock_price_cents else {
            return Err(ClientError::Decode {
                entity: "post",
                message: "premium post carries no unlock price".into(),
            });
        };

        let ledger = self.store.list_transactions(viewer_id).await?;
        let already_unlocked = ledger.iter().any(|entry| {
            entry.kind == TransactionKind::PostUnlock && entry.reference_id == Some(post.id)
        });
        if already_unlocked {
            return Ok(post);
        }

        if balance_cents(&ledger) < price {
            return Err(ClientError::validation("insufficient wallet balance"));
        }

        self.store
            .insert_transaction(NewTransaction {
                user_id: viewer_id,
                kind: TransactionKind::PostUnlock,
                amount_cents: -price,
                reference_id: Some(post.id),
            })
            .await?;

        let draft = NewNotification {
            user_id: post.author_id,
            kind: NotificationKind::PostUnlocked,
            actor_id: Some(viewer_id),
            reference_id: Some(post.id),
            body: "Someone unlocked your post".into(),
        };
        if let Err(err) = self.store.insert_notification(draft).await {
            warn!(post_id = %post.id, error = %err, "failed to record unlock notification");
        }

        Ok(post)
    }
}

impl std::fmt::Debug for PostService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use crate::services::{NotificationService, WalletService};

    struct Fixture {
        posts: PostService,
        wallet: WalletService,
        notifications: NotificationService,
        author: Uuid,
        viewer: Uuid,
    }

    async fn fixture() -> Fixture {
        let backend = Arc::new(MemoryBackend::new());
        let author = backend.seed_profile("author").await.id;
        let viewer = backend.seed_profile("viewer").await.id;
        Fixture {
            posts: PostService::new(backend.clone()),
            wallet: WalletService::new(backend.clone()),
            notifications: NotificationService::new(backend),
            author,
            viewer,
        }
    }

    async fn premium_post(fx: &Fixture, price: i64) -> Post {
        fx.posts
            .publish(NewPost {
                author_id: fx.author,
                body: "premium".into(),
                media_url: None,
                unlock_price_cents: Some(price),
            })
            .await
            .unwrap()
    }

    async fn top_up(fx: &Fixture, amount: i64) {
        fx.wallet
            .record(NewTransaction {
                user_id: fx.viewer,
                kind: TransactionKind::TopUp,
                amount_cents: amount,
                reference_id: None,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unlock_debits_the_wallet_once() {
        let fx = fixture().await;
        let post = premium_post(&fx, 499).await;
        top_up(&fx, 1000).await;

        fx.posts.unlock(post.id, fx.viewer).await.unwrap();
        assert_eq!(fx.wallet.balance(fx.viewer).await.unwrap(), 501);

        // Second unlock finds the receipt and does not debit again.
        fx.posts.unlock(post.id, fx.viewer).await.unwrap();
        assert_eq!(fx.wallet.balance(fx.viewer).await.unwrap(), 501);
    }

    #[tokio::test]
    async fn unlock_requires_sufficient_balance() {
        let fx = fixture().await;
        let post = premium_post(&fx, 499).await;
        top_up(&fx, 100).await;

        let result = fx.posts.unlock(post.id, fx.viewer).await;

        assert!(matches!(result, Err(ClientError::Validation { .. })));
        assert_eq!(fx.wallet.balance(fx.viewer).await.unwrap(), 100);
    }

    #[tokio::test]
    async fn free_posts_need_no_unlock() {
        let fx = fixture().await;
        let post = fx
            .posts
            .publish(NewPost {
                author_id: fx.author,
                body: "free".into(),
                media_url: None,
                unlock_price_cents: None,
            })
            .await
            .unwrap();

        fx.posts.unlock(post.id, fx.viewer).await.unwrap();

        assert_eq!(fx.wallet.balance(fx.viewer).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn like_notifies_the_author() {
        let fx = fixture().await;
        let post = premium_post(&fx, 100).await;

        let liked = fx.posts.like(post.id, fx.viewer).await.unwrap();
        assert_eq!(liked.like_count, 1);

        let unread = fx.notifications.unread_for(fx.author).await.unwrap();
        assert_eq!(unread.len(), 1);
        assert_eq!(unread[0].kind, NotificationKind::PostLiked);
        assert_eq!(unread[0].actor_id, Some(fx.viewer));
    }

    #[tokio::test]
    async fn self_like_is_not_notified() {
        let fx = fixture().await;
        let post = premium_post(&fx, 100).await;

        fx.posts.like(post.id, fx.author).await.unwrap();

        assert!(fx.notifications.unread_for(fx.author).await.unwrap().is_empty());
    }
}
