use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Timestamp;

/// A user profile as stored by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Unique identifier, issued by the auth collaborator.
    pub id: Uuid,

    /// Unique, user-chosen handle.
    pub handle: String,

    /// Optional display name shown instead of the handle.
    pub display_name: Option<String>,

    /// Free-form self description.
    pub bio: Option<String>,

    /// Location of the profile picture.
    pub avatar_url: Option<String>,

    /// Date of birth, used for age display.
    pub birthdate: Option<NaiveDate>,

    /// Self-selected interest tags.
    #[serde(default)]
    pub interests: Vec<String>,

    /// Whether the profile passed identity verification.
    pub is_verified: bool,

    /// When the profile was created.
    pub created_at: Timestamp,

    /// When the profile was last edited.
    pub updated_at: Timestamp,
}

/// Partial update applied to an existing profile; `None` fields are left
/// untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    /// New display name, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// New bio, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,

    /// New avatar location, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Replacement interest tags, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interests: Option<Vec<String>>,
}

impl ProfileUpdate {
    /// Whether this update would change anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.bio.is_none()
            && self.avatar_url.is_none()
            && self.interests.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_profile() -> Profile {
        Profile {
            id: Uuid::new_v4(),
            handle: "ada".into(),
            display_name: Some("Ada".into()),
            bio: None,
            avatar_url: None,
            birthdate: NaiveDate::from_ymd_opt(1995, 12, 10),
            interests: vec!["climbing".into(), "chess".into()],
            is_verified: true,
            created_at: Timestamp(Utc::now()),
            updated_at: Timestamp(Utc::now()),
        }
    }

    #[test]
    fn profile_round_trip() {
        let profile = sample_profile();
        let serialized = serde_json::to_string(&profile).unwrap();
        let deserialized: Profile = serde_json::from_str(&serialized).unwrap();

        assert_eq!(deserialized, profile);
    }

    #[test]
    fn missing_interests_default_to_empty() {
        let mut value = serde_json::to_value(sample_profile()).unwrap();
        value.as_object_mut().unwrap().remove("interests");

        let profile: Profile = serde_json::from_value(value).unwrap();
        assert!(profile.interests.is_empty());
    }

    #[test]
    fn empty_update_detected() {
        assert!(ProfileUpdate::default().is_empty());
        assert!(
            !ProfileUpdate {
                bio: Some("new bio".into()),
                ..ProfileUpdate::default()
            }
            .is_empty()
        );
    }
}
