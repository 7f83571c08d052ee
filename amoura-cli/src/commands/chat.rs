//! The `chat` command: open a conversation, send, and watch live messages.

use client::session::{ChatSession, ListenerState};
use shared::config::Config;
use shared::models::DeliveryState;
use uuid::Uuid;

use super::{build_realtime, build_store, resolve_user};

/// Opens the conversation with `peer`; optionally sends a message and/or
/// stays attached printing live messages until interrupted.
pub async fn run(
    config: &Config,
    user: Option<Uuid>,
    peer: Uuid,
    message: Option<String>,
    watch: bool,
) -> anyhow::Result<()> {
    let user = resolve_user(user)?;
    let session = ChatSession::open(
        build_store(config)?,
        build_realtime(config)?,
        user,
        peer,
        config.realtime.clone(),
    )
    .await?;

    if let Some(body) = message {
        let sent = session.send(body).await?;
        println!("sent {} at {}", sent.id, sent.created_at);
    }

    print_snapshot(&session, user).await;

    if watch {
        println!("watching; press ctrl-c to stop");
        let mut states = session.watch_listener();
        let mut seen = session.snapshot().await.len();
        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => break,
                changed = states.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    match *states.borrow() {
                        ListenerState::Error => println!("(reconnecting...)"),
                        ListenerState::Failed => {
                            println!("(realtime unavailable; showing cached messages only)");
                            break;
                        }
                        _ => {}
                    }
                }
                () = tokio::time::sleep(std::time::Duration::from_millis(250)) => {
                    let entries = session.snapshot().await;
                    for entry in entries.iter().skip(seen) {
                        print_entry(entry, user);
                    }
                    seen = entries.len();
                }
            }
        }
    }

    session.close().await;
    Ok(())
}

async fn print_snapshot(session: &ChatSession, me: Uuid) {
    for entry in session.snapshot().await {
        print_entry(&entry, me);
    }
}

fn print_entry(entry: &client::session::TimelineEntry, me: Uuid) {
    let who = if entry.message.sender_id == me {
        "me"
    } else {
        "them"
    };
    let marker = match entry.state {
        DeliveryState::Pending => " (sending)",
        DeliveryState::Failed => " (failed; retry or discard)",
        DeliveryState::Confirmed => "",
    };
    println!(
        "[{}] {}: {}{}",
        entry.message.created_at, who, entry.message.body, marker
    );
}
