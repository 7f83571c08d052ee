//! Realtime reconciliation listener.
//!
//! One listener per (conversation, session). It owns the subscription to the
//! conversation's message inserts, merges every authoritative row into the
//! session's [`MessageTimeline`], and resubscribes with a fixed backoff when
//! the channel fails. The transport promises no delivery order; the
//! timeline's sort is the display order.

use std::sync::Arc;

use futures_util::StreamExt;
use metrics::counter;
use rand::Rng;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use shared::config::RealtimeConfig;
use shared::models::{ChangeEvent, ChangeFilter};

use crate::backend::Realtime;

use super::timeline::MessageTimeline;

/// Listener lifecycle, published on a watch channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    /// Not subscribed; the initial state and the terminal state after an
    /// explicit stop.
    Disconnected,
    /// Waiting for the backend to acknowledge the channel.
    Subscribing,
    /// Live; inbound rows are being reconciled.
    Subscribed,
    /// The channel failed; a resubscription is pending after the backoff
    /// delay.
    Error,
    /// The attempt budget is spent; terminal, user-visible degraded state.
    Failed,
}

/// Reconnecting subscription driver for one conversation view.
#[derive(Debug)]
pub struct ConversationListener {
    state_rx: watch::Receiver<ListenerState>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl ConversationListener {
    /// Spawns the listener task for the timeline's conversation.
    ///
    /// The task drives the state machine until [`Self::stop`] is called or
    /// the attempt budget is spent.
    #[must_use]
    pub fn spawn(
        realtime: Arc<dyn Realtime>,
        timeline: Arc<Mutex<MessageTimeline>>,
        config: RealtimeConfig,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ListenerState::Disconnected);
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(run(
            realtime,
            timeline,
            config,
            state_tx,
            cancel.clone(),
        ));

        Self {
            state_rx,
            cancel,
            handle,
        }
    }

    /// Current listener state.
    #[must_use]
    pub fn state(&self) -> ListenerState {
        *self.state_rx.borrow()
    }

    /// A watch handle for observing state transitions.
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ListenerState> {
        self.state_rx.clone()
    }

    /// Tears the listener down.
    ///
    /// Cancels a pending backoff timer as well as a live subscription, so no
    /// reconnect can fire after teardown. Unless the listener had already
    /// spent its attempt budget, the final published state is
    /// [`ListenerState::Disconnected`].
    pub async fn stop(self) {
        self.cancel.cancel();
        let _ = self.handle.await;
    }
}

#[allow(clippy::too_many_lines)]
async fn run(
    realtime: Arc<dyn Realtime>,
    timeline: Arc<Mutex<MessageTimeline>>,
    config: RealtimeConfig,
    state_tx: watch::Sender<ListenerState>,
    cancel: CancellationToken,
) {
    let conversation_id = timeline.lock().await.conversation_id();
    let filter = ChangeFilter::conversation_messages(conversation_id);
    let set_state = |state: ListenerState| {
        let _ = state_tx.send(state);
    };

    let mut attempt: u32 = 0;
    loop {
        set_state(ListenerState::Subscribing);

        let subscribed = tokio::select! {
            () = cancel.cancelled() => break,
            result = timeout(config.ack_timeout(), realtime.subscribe(filter.clone())) => result,
        };

        match subscribed {
            Ok(Ok(mut subscription)) => {
                attempt = 0;
                set_state(ListenerState::Subscribed);
                counter!("amoura_realtime_subscriptions_total").increment(1);
                debug!(%conversation_id, "realtime channel subscribed");

                loop {
                    tokio::select! {
                        () = cancel.cancelled() => {
                            subscription.unsubscribe();
                            set_state(ListenerState::Disconnected);
                            return;
                        }
                        event = subscription.next() => match event {
                            Some(event) => {
                                handle_event(&filter, &timeline, event).await;
                            }
                            None => {
                                warn!(%conversation_id, "realtime channel ended");
                                break;
                            }
                        }
                    }
                }
            }
            Ok(Err(err)) => {
                warn!(%conversation_id, error = %err, "realtime subscribe failed");
            }
            Err(_) => {
                warn!(%conversation_id, "subscription acknowledgment timed out");
            }
        }

        attempt += 1;
        if let Some(max) = config.max_attempts
            && attempt >= max
        {
            counter!("amoura_realtime_failures_total").increment(1);
            warn!(%conversation_id, attempt, "realtime attempt budget spent, giving up");
            set_state(ListenerState::Failed);
            return;
        }

        set_state(ListenerState::Error);
        counter!("amoura_realtime_reconnects_total").increment(1);

        // Jitter keeps a fleet of clients from stampeding the backend after
        // a shared outage.
        let jitter = rand::rng().random_range(0..250);
        let delay = config.resubscribe_delay() + std::time::Duration::from_millis(jitter);
        tokio::select! {
            () = cancel.cancelled() => break,
            () = sleep(delay) => {}
        }
    }

    set_state(ListenerState::Disconnected);
}

async fn handle_event(
    filter: &ChangeFilter,
    timeline: &Arc<Mutex<MessageTimeline>>,
    event: ChangeEvent,
) {
    counter!("amoura_realtime_events_total").increment(1);
    if !filter.matches(&event) {
        counter!("amoura_realtime_dropped_events_total").increment(1);
        return;
    }

    match event.message() {
        Ok(message) => {
            if timeline.lock().await.reconcile(message) {
                counter!("amoura_realtime_reconciled_total").increment(1);
            }
        }
        Err(err) => {
            // Malformed rows are dropped, never fatal to the session.
            counter!("amoura_realtime_dropped_events_total").increment(1);
            warn!(error = %err, "dropping undecodable change event");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DataStore, MemoryBackend};
    use shared::models::{ChangeOp, ConversationKey, NewMessage};
    use std::time::Duration;
    use uuid::Uuid;

    fn test_config() -> RealtimeConfig {
        RealtimeConfig {
            resubscribe_delay_ms: 20,
            max_attempts: Some(3),
            ack_timeout_ms: 500,
        }
    }

    async fn wait_for_state(
        rx: &mut watch::Receiver<ListenerState>,
        wanted: ListenerState,
    ) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while *rx.borrow() != wanted {
                rx.changed().await.unwrap();
            }
        })
        .await
        .unwrap_or_else(|_| panic!("listener never reached {wanted:?}"));
    }

    async fn backend_with_conversation() -> (Arc<MemoryBackend>, Uuid, Uuid, Uuid) {
        let backend = Arc::new(MemoryBackend::new());
        let a = backend.seed_profile("a").await.id;
        let b = backend.seed_profile("b").await.id;
        let conversation = backend
            .upsert_conversation(ConversationKey::new(a, b).unwrap())
            .await
            .unwrap();
        (backend, conversation.id, a, b)
    }

    #[tokio::test]
    async fn inserted_rows_are_reconciled_into_the_timeline() {
        let (backend, conversation_id, a, b) = backend_with_conversation().await;
        let timeline = Arc::new(Mutex::new(MessageTimeline::new(conversation_id)));
        let listener = ConversationListener::spawn(
            backend.clone(),
            timeline.clone(),
            test_config(),
        );

        let mut state = listener.watch_state();
        wait_for_state(&mut state, ListenerState::Subscribed).await;

        let sent = backend
            .insert_message(NewMessage {
                conversation_id,
                sender_id: a,
                recipient_id: b,
                body: "over the wire".into(),
                reply_to: None,
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !timeline.lock().await.entries().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("row never reconciled");

        assert_eq!(timeline.lock().await.entries()[0].message, sent);
        listener.stop().await;
    }

    #[tokio::test]
    async fn channel_failure_triggers_resubscription() {
        let (backend, conversation_id, a, b) = backend_with_conversation().await;
        let timeline = Arc::new(Mutex::new(MessageTimeline::new(conversation_id)));
        let listener = ConversationListener::spawn(
            backend.clone(),
            timeline.clone(),
            test_config(),
        );

        let mut state = listener.watch_state();
        wait_for_state(&mut state, ListenerState::Subscribed).await;

        backend.disconnect_all();
        wait_for_state(&mut state, ListenerState::Error).await;
        wait_for_state(&mut state, ListenerState::Subscribed).await;

        // The fresh channel still delivers.
        backend
            .insert_message(NewMessage {
                conversation_id,
                sender_id: a,
                recipient_id: b,
                body: "after reconnect".into(),
                reply_to: None,
            })
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                if !timeline.lock().await.entries().is_empty() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("row never reconciled after reconnect");

        listener.stop().await;
    }

    #[tokio::test]
    async fn spent_attempt_budget_is_terminal() {
        let (backend, conversation_id, _, _) = backend_with_conversation().await;
        backend.fail_next_subscribes(10);
        let timeline = Arc::new(Mutex::new(MessageTimeline::new(conversation_id)));
        let listener = ConversationListener::spawn(
            backend,
            timeline,
            test_config(),
        );

        let mut state = listener.watch_state();
        wait_for_state(&mut state, ListenerState::Failed).await;

        listener.stop().await;
    }

    #[tokio::test]
    async fn stop_mid_backoff_cancels_the_retry_timer() {
        let (backend, conversation_id, _, _) = backend_with_conversation().await;
        backend.fail_next_subscribes(2);
        let timeline = Arc::new(Mutex::new(MessageTimeline::new(conversation_id)));
        let config = RealtimeConfig {
            resubscribe_delay_ms: 60_000,
            max_attempts: Some(10),
            ack_timeout_ms: 500,
        };
        let listener = ConversationListener::spawn(backend, timeline, config);

        let mut state = listener.watch_state();
        wait_for_state(&mut state, ListenerState::Error).await;

        // Stopping while the one-minute backoff is pending must return
        // promptly instead of waiting the timer out.
        tokio::time::timeout(Duration::from_secs(2), listener.stop())
            .await
            .expect("stop dangled on the backoff timer");
    }

    #[tokio::test]
    async fn foreign_and_malformed_events_are_dropped() {
        let (backend, conversation_id, _, _) = backend_with_conversation().await;
        let timeline = Arc::new(Mutex::new(MessageTimeline::new(conversation_id)));
        let listener = ConversationListener::spawn(
            backend.clone(),
            timeline.clone(),
            test_config(),
        );

        let mut state = listener.watch_state();
        wait_for_state(&mut state, ListenerState::Subscribed).await;

        backend.emit(ChangeEvent {
            table: "messages".into(),
            op: ChangeOp::Insert,
            record: serde_json::json!({
                "id": "not-a-uuid",
                "conversation_id": conversation_id,
            }),
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(timeline.lock().await.entries().is_empty());
        assert_eq!(listener.state(), ListenerState::Subscribed);

        listener.stop().await;
    }
}
