//! The `feed` command: list the feed or publish a post.

use client::services::PostService;
use shared::config::Config;
use shared::models::NewPost;
use uuid::Uuid;

use super::{build_store, resolve_user};

/// Publishes a post when `--publish` is given, otherwise prints the feed.
pub async fn run(
    config: &Config,
    user: Option<Uuid>,
    publish: Option<String>,
    price_cents: Option<i64>,
) -> anyhow::Result<()> {
    let user = resolve_user(user)?;
    let service = PostService::new(build_store(config)?);

    if let Some(body) = publish {
        let post = service
            .publish(NewPost {
                author_id: user,
                body,
                media_url: None,
                unlock_price_cents: price_cents,
            })
            .await?;
        println!("published {}", post.id);
        return Ok(());
    }

    for post in service.feed_for(user).await? {
        let gate = match post.unlock_price_cents {
            Some(price) if post.is_premium => format!(" [premium {price}c]"),
            _ => String::new(),
        };
        println!(
            "{} {}{} ({} likes)",
            post.created_at, post.body, gate, post.like_count
        );
    }
    Ok(())
}
