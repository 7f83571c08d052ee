//! Notification service layer.

use std::sync::Arc;
use uuid::Uuid;

use shared::models::{ClientResult, Notification};

use crate::backend::DataStore;

/// Service for reading and acknowledging in-app notifications.
#[derive(Clone)]
pub struct NotificationService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl NotificationService {
    /// Creates a new notification service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Lists a user's unread notifications, newest first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn unread_for(&self, user_id: Uuid) -> ClientResult<Vec<Notification>> {
        self.store.list_notifications(user_id, true).await
    }

    /// Lists all of a user's notifications, newest first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn all_for(&self, user_id: Uuid) -> ClientResult<Vec<Notification>> {
        self.store.list_notifications(user_id, false).await
    }

    /// Marks a notification as read.
    ///
    /// # Errors
    /// Returns an error if the notification does not exist or the update
    /// fails.
    pub async fn mark_read(&self, notification_id: Uuid) -> ClientResult<Notification> {
        self.store.mark_notification_read(notification_id).await
    }
}

impl std::fmt::Debug for NotificationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotificationService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DataStore, MemoryBackend};
    use shared::models::{NewNotification, NotificationKind};

    #[tokio::test]
    async fn mark_read_removes_from_unread() {
        let backend = Arc::new(MemoryBackend::new());
        let user = backend.seed_profile("ada").await.id;
        let service = NotificationService::new(backend.clone());

        let stored = backend
            .insert_notification(NewNotification {
                user_id: user,
                kind: NotificationKind::NewMessage,
                actor_id: None,
                reference_id: None,
                body: "You have a new message".into(),
            })
            .await
            .unwrap();

        assert_eq!(service.unread_for(user).await.unwrap().len(), 1);

        service.mark_read(stored.id).await.unwrap();

        assert!(service.unread_for(user).await.unwrap().is_empty());
        assert_eq!(service.all_for(user).await.unwrap().len(), 1);
    }
}
