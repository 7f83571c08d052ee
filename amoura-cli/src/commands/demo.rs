//! The `demo` command: the full messaging flow against the in-memory
//! backend, no hosted service required.

use std::sync::Arc;
use std::time::Duration;

use client::backend::MemoryBackend;
use client::session::{ChatSession, ListenerState};
use shared::config::RealtimeConfig;
use shared::models::DeliveryState;

/// Runs the two-user optimistic-messaging walkthrough.
pub async fn run() -> anyhow::Result<()> {
    let backend = Arc::new(MemoryBackend::new());
    let ada = backend.seed_profile("ada").await;
    let noah = backend.seed_profile("noah").await;
    let config = RealtimeConfig {
        resubscribe_delay_ms: 200,
        max_attempts: Some(5),
        ack_timeout_ms: 1_000,
    };

    println!("opening the conversation from both sides...");
    let ada_session = ChatSession::open(
        backend.clone(),
        backend.clone(),
        ada.id,
        noah.id,
        config.clone(),
    )
    .await?;
    let noah_session = ChatSession::open(
        backend.clone(),
        backend.clone(),
        noah.id,
        ada.id,
        config,
    )
    .await?;
    println!(
        "both sides derived conversation {} — no duplicate row\n",
        ada_session.conversation().id
    );

    wait_for(&noah_session, ListenerState::Subscribed).await;

    println!("ada sends a message (optimistic, then confirmed):");
    let sent = ada_session.send("hey noah!").await?;
    println!("  confirmed as {} at {}", sent.id, sent.created_at);

    wait_until(async || {
        noah_session
            .snapshot()
            .await
            .iter()
            .any(|entry| entry.message.id == sent.id)
    })
    .await;
    println!("  noah's session reconciled it over the live channel\n");

    println!("simulating a channel outage...");
    backend.disconnect_all();
    wait_for(&noah_session, ListenerState::Error).await;
    println!("  listener state: reconnecting");
    wait_for(&noah_session, ListenerState::Subscribed).await;
    println!("  listener state: subscribed again\n");

    let reply = noah_session.send("hey ada, still live!").await?;
    wait_until(async || {
        ada_session
            .snapshot()
            .await
            .iter()
            .any(|entry| entry.message.id == reply.id)
    })
    .await;

    println!("final timeline, as ada sees it:");
    for entry in ada_session.snapshot().await {
        let who = if entry.message.sender_id == ada.id {
            "ada"
        } else {
            "noah"
        };
        debug_assert_eq!(entry.state, DeliveryState::Confirmed);
        println!("  [{}] {}: {}", entry.message.created_at, who, entry.message.body);
    }

    ada_session.close().await;
    noah_session.close().await;
    Ok(())
}

async fn wait_for(session: &ChatSession, wanted: ListenerState) {
    let mut states = session.watch_listener();
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while *states.borrow() != wanted {
            if states.changed().await.is_err() {
                break;
            }
        }
    })
    .await;
}

async fn wait_until<F>(mut condition: F)
where
    F: AsyncFnMut() -> bool,
{
    let _ = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
}
