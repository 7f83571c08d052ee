use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;

use super::errors::ClientError;
use super::message::Message;
use super::notification::Notification;

/// Change operation reported by the realtime collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeOp {
    Insert,
    Update,
    Delete,
}

/// Table names this client subscribes to.
pub mod tables {
    /// Direct-message rows.
    pub const MESSAGES: &str = "messages";
    /// In-app notification rows.
    pub const NOTIFICATIONS: &str = "notifications";
}

/// One change notification as delivered by the realtime collaborator.
///
/// The record arrives as a loosely-typed JSON object; callers go through the
/// typed accessors below, which validate on ingress instead of trusting the
/// transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    /// Table the change happened on.
    pub table: String,
    /// What kind of change it was.
    pub op: ChangeOp,
    /// The changed row, as sent by the backend.
    pub record: Value,
}

impl ChangeEvent {
    /// Decodes the carried record into `T`, naming `entity` in the error.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the record does not match the
    /// expected shape.
    pub fn decode<T: DeserializeOwned>(&self, entity: &'static str) -> Result<T, ClientError> {
        serde_json::from_value(self.record.clone()).map_err(|err| ClientError::Decode {
            entity,
            message: err.to_string(),
        })
    }

    /// Decodes the event as a message row.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the event is not a `messages` event
    /// or the record is malformed.
    pub fn message(&self) -> Result<Message, ClientError> {
        if self.table != tables::MESSAGES {
            return Err(ClientError::Decode {
                entity: "message",
                message: format!("event is for table `{}`", self.table),
            });
        }
        self.decode("message")
    }

    /// Decodes the event as a notification row.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the event is not a `notifications`
    /// event or the record is malformed.
    pub fn notification(&self) -> Result<Notification, ClientError> {
        if self.table != tables::NOTIFICATIONS {
            return Err(ClientError::Decode {
                entity: "notification",
                message: format!("event is for table `{}`", self.table),
            });
        }
        self.decode("notification")
    }
}

/// Server-side filter a subscription is opened with.
///
/// Mirrors the realtime collaborator's `subscribe(table, event, filter)`
/// surface: changes are narrowed to one table, optionally one operation, and
/// optionally one conversation partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeFilter {
    /// Table to watch.
    pub table: String,
    /// Restrict to one operation, or watch them all.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<ChangeOp>,
    /// Restrict to rows of one conversation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<Uuid>,
}

impl ChangeFilter {
    /// Filter for inserted messages of one conversation.
    #[must_use]
    pub fn conversation_messages(conversation_id: Uuid) -> Self {
        Self {
            table: tables::MESSAGES.to_string(),
            op: Some(ChangeOp::Insert),
            conversation_id: Some(conversation_id),
        }
    }

    /// Whether `event` passes this filter.
    #[must_use]
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        if event.table != self.table {
            return false;
        }
        if let Some(op) = self.op
            && op != event.op
        {
            return false;
        }
        if let Some(conversation_id) = self.conversation_id {
            let carried = event
                .record
                .get("conversation_id")
                .and_then(Value::as_str)
                .and_then(|raw| Uuid::parse_str(raw).ok());
            return carried == Some(conversation_id);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Timestamp;
    use chrono::Utc;

    fn message_event(conversation_id: Uuid) -> ChangeEvent {
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id,
            sender_id: Uuid::new_v4(),
            recipient_id: Uuid::new_v4(),
            body: "hi".into(),
            reply_to: None,
            is_read: false,
            created_at: Timestamp(Utc::now()),
        };
        ChangeEvent {
            table: tables::MESSAGES.into(),
            op: ChangeOp::Insert,
            record: serde_json::to_value(message).unwrap(),
        }
    }

    #[test]
    fn typed_decode_succeeds_for_well_formed_row() {
        let conversation_id = Uuid::new_v4();
        let event = message_event(conversation_id);

        let message = event.message().unwrap();
        assert_eq!(message.conversation_id, conversation_id);
    }

    #[test]
    fn malformed_row_is_a_decode_error() {
        let event = ChangeEvent {
            table: tables::MESSAGES.into(),
            op: ChangeOp::Insert,
            record: serde_json::json!({ "id": "not-a-uuid" }),
        };

        assert!(matches!(
            event.message(),
            Err(ClientError::Decode { entity: "message", .. })
        ));
    }

    #[test]
    fn wrong_table_is_a_decode_error() {
        let event = message_event(Uuid::new_v4());
        assert!(event.notification().is_err());
    }

    #[test]
    fn conversation_filter_matches_only_its_partition() {
        let mine = Uuid::new_v4();
        let filter = ChangeFilter::conversation_messages(mine);

        assert!(filter.matches(&message_event(mine)));
        assert!(!filter.matches(&message_event(Uuid::new_v4())));
    }

    #[test]
    fn op_mismatch_is_filtered_out() {
        let mine = Uuid::new_v4();
        let filter = ChangeFilter::conversation_messages(mine);
        let mut event = message_event(mine);
        event.op = ChangeOp::Update;

        assert!(!filter.matches(&event));
    }
}
