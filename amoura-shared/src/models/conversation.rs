use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;
use super::errors::ClientError;

/// Fixed namespace for deriving conversation identifiers.
///
/// Changing this value changes every derived conversation id, so it is part
/// of the storage contract and must never be rotated.
const CONVERSATION_NAMESPACE: Uuid = Uuid::from_u128(0x9f2c_4b1e_8d57_4a6f_b3a0_1c5e_7d42_96e8);

/// Canonical unordered pair of participants in a direct conversation.
///
/// The pair is ordered so that `participant_a < participant_b`, which makes
/// the derived conversation identifier commutative: the same two users always
/// map to the same conversation no matter who opens it first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationKey {
    /// The smaller participant identifier.
    pub participant_a: Uuid,
    /// The larger participant identifier.
    pub participant_b: Uuid,
}

impl ConversationKey {
    /// Builds the canonical key for a pair of participants.
    ///
    /// # Arguments
    /// * `first` - One participant's identifier, in either position
    /// * `second` - The other participant's identifier
    ///
    /// # Errors
    /// Returns [`ClientError::Validation`] if either identifier is nil, or if
    /// both identifiers are equal (self-conversations are not supported).
    pub fn new(first: Uuid, second: Uuid) -> Result<Self, ClientError> {
        if first.is_nil() || second.is_nil() {
            return Err(ClientError::validation("participant id must not be nil"));
        }
        if first == second {
            return Err(ClientError::validation(
                "a conversation requires two distinct participants",
            ));
        }

        let (participant_a, participant_b) = if first < second {
            (first, second)
        } else {
            (second, first)
        };

        Ok(Self {
            participant_a,
            participant_b,
        })
    }

    /// Derives the stable conversation identifier for this pair.
    ///
    /// The identifier is a v5 (name-based) UUID over the canonical
    /// `"{a}:{b}"` string, so `id(a, b) == id(b, a)` by construction.
    /// Collision-freedom is the hash's own bound; nothing stronger is
    /// guaranteed or needed.
    #[must_use]
    pub fn conversation_id(&self) -> Uuid {
        let name = format!("{}:{}", self.participant_a, self.participant_b);
        Uuid::new_v5(&CONVERSATION_NAMESPACE, name.as_bytes())
    }

    /// Returns the participant that is not `user_id`, if `user_id` is part of
    /// this conversation at all.
    #[must_use]
    pub fn counterpart(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.participant_a {
            Some(self.participant_b)
        } else if user_id == self.participant_b {
            Some(self.participant_a)
        } else {
            None
        }
    }
}

/// A direct conversation row as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    /// Derived identifier, a pure function of the participant pair.
    pub id: Uuid,

    /// The smaller participant identifier.
    pub participant_a: Uuid,

    /// The larger participant identifier.
    pub participant_b: Uuid,

    /// Set once, when the first message attempt creates the row.
    pub created_at: Timestamp,

    /// Bumped on every new message.
    pub updated_at: Timestamp,
}

impl Conversation {
    /// The canonical participant pair of this conversation.
    ///
    /// # Errors
    /// Returns [`ClientError::Decode`] if the stored row violates the pair
    /// invariants, which would mean the backend handed back a corrupt record.
    pub fn key(&self) -> Result<ConversationKey, ClientError> {
        ConversationKey::new(self.participant_a, self.participant_b).map_err(|_| {
            ClientError::Decode {
                entity: "conversation",
                message: "stored participant pair is not a valid key".into(),
            }
        })
    }
}
