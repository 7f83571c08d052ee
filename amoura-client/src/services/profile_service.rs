//! Profile service layer.

use std::sync::Arc;
use uuid::Uuid;

use shared::models::{ClientError, ClientResult, Profile, ProfileUpdate};

use crate::backend::DataStore;

/// Service for reading and editing user profiles.
#[derive(Clone)]
pub struct ProfileService {
    /// Storage collaborator handle.
    store: Arc<dyn DataStore>,
}

impl ProfileService {
    /// Creates a new profile service over the given store.
    #[must_use]
    pub fn new(store: Arc<dyn DataStore>) -> Self {
        Self { store }
    }

    /// Fetches a profile by user id.
    ///
    /// # Errors
    /// Returns an error if the profile does not exist or the query fails.
    pub async fn get(&self, user_id: Uuid) -> ClientResult<Profile> {
        self.store.fetch_profile(user_id).await
    }

    /// Applies a partial update to the caller's profile.
    ///
    /// # Errors
    /// Returns a validation error for an empty update, and propagates
    /// backend failures.
    pub async fn update(&self, user_id: Uuid, update: ProfileUpdate) -> ClientResult<Profile> {
        if update.is_empty() {
            return Err(ClientError::validation("profile update changes nothing"));
        }
        self.store.update_profile(user_id, update).await
    }

    /// Lists profiles shown in discovery, newest first.
    ///
    /// # Errors
    /// Returns an error if the backend query fails.
    pub async fn discover(&self) -> ClientResult<Vec<Profile>> {
        self.store.list_profiles().await
    }
}

impl std::fmt::Debug for ProfileService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProfileService").finish_non_exhaustive()
    }
}
