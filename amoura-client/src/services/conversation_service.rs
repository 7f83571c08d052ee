//! Conversation management service layer.
//!
//! Conversations are keyed by an identifier derived from the participant
//! pair, so get-or-create is a single idempotent upsert: both participants
//! can race the first message attempt and still land on one row.

use std::sync::Arc;
use uuid::Uuid;

use shared::models::{ClientResult, Conversation, ConversationKey};

use crate::backend::DataStore;

/// Service for managing direct conversations.
#[derive(Clone)]
pub struct ConversationService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl ConversationService {
    /// Creates a new conversation service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Returns the conversation between two users, creating it if absent.
    ///
    /// # Arguments
    /// * `first` - One participant's identifier, in either position
    /// * `second` - The other participant's identifier
    ///
    /// # Returns
    /// The conversation row; concurrent calls from both participants resolve
    /// to the same single row.
    ///
    /// # Errors
    /// Returns a validation error for nil or equal identifiers, or a backend
    /// error if the upsert fails.
    pub async fn open(&self, first: Uuid, second: Uuid) -> ClientResult<Conversation> {
        let key = ConversationKey::new(first, second)?;
        self.store.upsert_conversation(key).await
    }

    /// Lists a user's conversations, most recently active first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn list_for(&self, user_id: Uuid) -> ClientResult<Vec<Conversation>> {
        self.store.list_conversations(user_id).await
    }
}

impl std::fmt::Debug for ConversationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationService").finish_non_exhaustive()
    }
}
