use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewMessage,
    PostLiked,
    PostUnlocked,
    WalletCredited,
}

impl NotificationKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NewMessage => "new_message",
            Self::PostLiked => "post_liked",
            Self::PostUnlocked => "post_unlocked",
            Self::WalletCredited => "wallet_credited",
        }
    }
}

/// An in-app notification row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    /// The user being notified.
    pub user_id: Uuid,
    pub kind: NotificationKind,
    /// The user whose action triggered the notification, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    /// The entity the notification points at (message, post, transaction).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
    pub body: String,
    pub is_read: bool,
    pub created_at: Timestamp,
}

/// Request payload for recording a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub kind: NotificationKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<Uuid>,
    pub body: String,
}
