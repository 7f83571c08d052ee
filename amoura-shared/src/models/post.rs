use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;
use super::errors::ClientError;

/// A feed post as stored by the backend.
///
/// Premium posts carry an unlock price; viewers other than the author pay it
/// once through the wallet before the body is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// Unique identifier for the post.
    pub id: Uuid,

    /// Author of the post.
    pub author_id: Uuid,

    /// Post text.
    pub body: String,

    /// Attached media location, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    /// Whether the post is gated behind a one-time unlock.
    pub is_premium: bool,

    /// Unlock price in cents; present exactly when the post is premium.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_price_cents: Option<i64>,

    /// Denormalized like counter maintained by the backend.
    pub like_count: i64,

    /// Commit timestamp assigned by the storage layer.
    pub created_at: Timestamp,
}

/// Request payload for publishing a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    /// Author of the post.
    pub author_id: Uuid,
    /// Post text.
    pub body: String,
    /// Attached media location, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    /// Unlock price in cents; `Some` makes the post premium.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unlock_price_cents: Option<i64>,
}

impl NewPost {
    /// Validates the monetization fields before any network call.
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] for an empty body, a nil author,
    /// or a non-positive unlock price.
    pub fn validate(&self) -> Result<(), ClientError> {
        if self.author_id.is_nil() {
            return Err(ClientError::validation("post author must not be nil"));
        }
        if self.body.trim().is_empty() {
            return Err(ClientError::validation("post body must not be empty"));
        }
        if let Some(price) = self.unlock_price_cents
            && price <= 0
        {
            return Err(ClientError::validation(
                "unlock price must be a positive amount of cents",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn draft(price: Option<i64>) -> NewPost {
        NewPost {
            author_id: Uuid::new_v4(),
            body: "first post".into(),
            media_url: None,
            unlock_price_cents: price,
        }
    }

    #[test]
    fn free_and_premium_drafts_validate() {
        assert!(draft(None).validate().is_ok());
        assert!(draft(Some(499)).validate().is_ok());
    }

    #[test]
    fn zero_price_is_rejected() {
        let err = draft(Some(0)).validate().unwrap_err();
        assert!(matches!(err, ClientError::Validation { .. }));
    }

    #[test]
    fn blank_body_is_rejected() {
        let mut post = draft(None);
        post.body = "   ".into();
        assert!(post.validate().is_err());
    }

    #[test]
    fn post_round_trip_omits_absent_price() {
        let post = Post {
            id: Uuid::new_v4(),
            author_id: Uuid::new_v4(),
            body: "hello".into(),
            media_url: None,
            is_premium: false,
            unlock_price_cents: None,
            like_count: 3,
            created_at: Timestamp(Utc::now()),
        };

        let serialized = serde_json::to_string(&post).unwrap();
        assert!(!serialized.contains("unlock_price_cents"));

        let deserialized: Post = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, post);
    }
}
