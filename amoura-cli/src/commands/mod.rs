//! CLI command implementations.

pub mod chat;
pub mod completion;
pub mod demo;
pub mod feed;
pub mod profile;
pub mod wallet;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use client::backend::{DataStore, Realtime, RestDataStore, SseRealtime};
use shared::config::Config;
use uuid::Uuid;

/// Resolves the acting user: the `--user` flag, falling back to the
/// `AMOURA_USER_ID` environment variable the auth flow exports.
pub fn resolve_user(flag: Option<Uuid>) -> anyhow::Result<Uuid> {
    if let Some(user) = flag {
        return Ok(user);
    }
    let raw = env::var("AMOURA_USER_ID")
        .context("no --user flag and AMOURA_USER_ID is not set")?;
    Uuid::parse_str(&raw).context("AMOURA_USER_ID is not a valid UUID")
}

/// The caller's opaque auth token, if the auth flow exported one.
fn auth_token() -> Option<String> {
    env::var("AMOURA_AUTH_TOKEN").ok()
}

/// Builds the storage collaborator from the configuration.
pub fn build_store(config: &Config) -> anyhow::Result<Arc<dyn DataStore>> {
    let store = RestDataStore::new(config, auth_token())?;
    Ok(Arc::new(store))
}

/// Builds the realtime collaborator from the configuration.
pub fn build_realtime(config: &Config) -> anyhow::Result<Arc<dyn Realtime>> {
    let realtime = SseRealtime::new(config, auth_token())?;
    Ok(Arc::new(realtime))
}
