//! The `profile` command: show or edit the caller's profile.

use client::services::ProfileService;
use shared::config::Config;
use shared::models::ProfileUpdate;
use uuid::Uuid;

use super::{build_store, resolve_user};

/// Shows the profile, applying any requested edits first.
pub async fn run(
    config: &Config,
    user: Option<Uuid>,
    display_name: Option<String>,
    bio: Option<String>,
) -> anyhow::Result<()> {
    let user = resolve_user(user)?;
    let service = ProfileService::new(build_store(config)?);

    let update = ProfileUpdate {
        display_name,
        bio,
        ..ProfileUpdate::default()
    };
    let profile = if update.is_empty() {
        service.get(user).await?
    } else {
        service.update(user, update).await?
    };

    println!("@{}", profile.handle);
    if let Some(name) = &profile.display_name {
        println!("name:     {name}");
    }
    if let Some(bio) = &profile.bio {
        println!("bio:      {bio}");
    }
    println!("verified: {}", profile.is_verified);
    println!("joined:   {}", profile.created_at);
    Ok(())
}
