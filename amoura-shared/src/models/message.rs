use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

/// A direct message row as stored by the backend.
///
/// `id` and `created_at` are assigned by the storage layer at commit time so
/// that ordering stays consistent across clients; a locally created message
/// carries a client-generated id and the local clock only until the server
/// confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier for the message.
    pub id: Uuid,

    /// ID of the conversation this message belongs to.
    pub conversation_id: Uuid,

    /// ID of the user who sent the message.
    pub sender_id: Uuid,

    /// ID of the user the message is addressed to.
    pub recipient_id: Uuid,

    /// The message content.
    pub body: String,

    /// Message this one replies to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,

    /// Whether the recipient has read the message.
    pub is_read: bool,

    /// Commit timestamp assigned by the storage layer.
    pub created_at: Timestamp,
}

/// Request payload for appending a message to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessage {
    /// The conversation to append to.
    pub conversation_id: Uuid,

    /// The sending user.
    pub sender_id: Uuid,

    /// The receiving user.
    pub recipient_id: Uuid,

    /// The message content.
    pub body: String,

    /// Message this one replies to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<Uuid>,
}

/// Client-session delivery state of a displayed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryState {
    /// Speculatively shown, not yet confirmed by the server.
    Pending,
    /// Confirmed by the server.
    Confirmed,
    /// The send failed; the UI can offer retry or discard.
    Failed,
}

impl DeliveryState {
    /// Stable string form used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for DeliveryState {
    type Error = &'static str;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "failed" => Ok(Self::Failed),
            _ => Err("invalid delivery state"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use test_case::test_case;

    #[test]
    fn test_message_serialization() {
        let id = Uuid::parse_str("f47ac10b-58cc-4372-a567-0e02b2c3d479").unwrap();
        let sender_id = Uuid::parse_str("550e8400-e29b-41d4-a716-446655440000").unwrap();
        let recipient_id = Uuid::parse_str("6ba7b810-9dad-11d1-80b4-00c04fd430c8").unwrap();
        let dt = Utc.with_ymd_and_hms(2025, 3, 8, 14, 30, 0).unwrap();

        let message = Message {
            id,
            conversation_id: Uuid::new_v4(),
            sender_id,
            recipient_id,
            body: "Test message".to_string(),
            reply_to: None,
            is_read: false,
            created_at: Timestamp(dt),
        };

        let serialized = serde_json::to_string(&message).unwrap();
        let deserialized: Message = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, message);
        assert!(!serialized.contains("reply_to"));
    }

    #[test]
    fn test_message_reply_reference_round_trip() {
        let parent = Uuid::new_v4();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            body: "replying".to_string(),
            reply_to: Some(parent),
            is_read: true,
            created_at: Timestamp(Utc::now()),
        };

        let serialized = serde_json::to_string(&message).unwrap();
        let deserialized: Message = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized.reply_to, Some(parent));
    }

    #[test_case(DeliveryState::Pending, "pending")]
    #[test_case(DeliveryState::Confirmed, "confirmed")]
    #[test_case(DeliveryState::Failed, "failed")]
    fn delivery_state_round_trip(state: DeliveryState, raw: &str) {
        assert_eq!(state.as_str(), raw);
        assert_eq!(DeliveryState::try_from(raw), Ok(state));
    }

    #[test]
    fn unknown_delivery_state_is_rejected() {
        assert!(DeliveryState::try_from("queued").is_err());
    }
}
