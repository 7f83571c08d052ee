//! Optimistic message timeline for one conversation view.
//!
//! The timeline is the authoritative-for-display ordered list of a
//! conversation's messages in one client session. Locally-originated
//! messages are shown speculatively with a client-generated id and the local
//! clock as a provisional timestamp; server-confirmed rows replace them on
//! reconciliation. The sort order is the display order — the notification
//! transport promises nothing about delivery order.

use chrono::Duration;
use uuid::Uuid;

use shared::models::{DeliveryState, Message, NewMessage, Timestamp};

/// How far a confirmed row's commit timestamp may drift from a pending
/// entry's provisional timestamp and still match it.
const PENDING_MATCH_WINDOW_SECS: i64 = 60;

/// One displayed message with its client-session delivery state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimelineEntry {
    /// The message row; pending entries carry a client-generated id and a
    /// provisional timestamp.
    pub message: Message,
    /// Delivery state of this entry within the session.
    pub state: DeliveryState,
}

impl TimelineEntry {
    fn sort_key(&self) -> (Timestamp, Uuid) {
        (self.message.created_at, self.message.id)
    }
}

/// Session-scoped ordered view of one conversation's messages.
///
/// Owned by the session displaying the conversation; never shared across
/// sessions. All mutation goes through the methods below, which keep the
/// entries sorted by `(created_at, id)` and free of duplicate server ids.
#[derive(Debug)]
pub struct MessageTimeline {
    conversation_id: Uuid,
    entries: Vec<TimelineEntry>,
}

impl MessageTimeline {
    /// Creates an empty timeline for a conversation.
    #[must_use]
    pub const fn new(conversation_id: Uuid) -> Self {
        Self {
            conversation_id,
            entries: Vec::new(),
        }
    }

    /// The conversation this timeline displays.
    #[must_use]
    pub const fn conversation_id(&self) -> Uuid {
        self.conversation_id
    }

    /// The displayed entries, in display order.
    #[must_use]
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// Seeds the timeline from a fetched history.
    ///
    /// Rows are merged through [`Self::reconcile`], so reloading a history
    /// over a live timeline never duplicates entries.
    pub fn load(&mut self, history: Vec<Message>) {
        for message in history {
            self.reconcile(message);
        }
    }

    /// Inserts a speculative entry for a message the session just sent.
    ///
    /// Returns the entry's client-generated id, which the caller holds on to
    /// for [`Self::mark_failed`]. If a pending entry with the same sender
    /// and body already sits inside the match window, its id is returned
    /// instead of adding a duplicate.
    pub fn append_local(&mut self, draft: &NewMessage) -> Uuid {
        let now = Timestamp::now();
        if let Some(existing) = self.entries.iter().find(|entry| {
            entry.state == DeliveryState::Pending
                && entry.message.sender_id == draft.sender_id
                && entry.message.body == draft.body
                && within_match_window(entry.message.created_at, now)
        }) {
            return existing.message.id;
        }

        let local_id = Uuid::new_v4();
        self.entries.push(TimelineEntry {
            message: Message {
                id: local_id,
                conversation_id: draft.conversation_id,
                sender_id: draft.sender_id,
                recipient_id: draft.recipient_id,
                body: draft.body.clone(),
                reply_to: draft.reply_to,
                is_read: false,
                created_at: now,
            },
            state: DeliveryState::Pending,
        });
        self.sort();
        local_id
    }

    /// Merges a server-confirmed row into the timeline.
    ///
    /// If the row's id is already present this is a no-op; if a pending
    /// entry from the same sender with the same body sits inside the match
    /// window, the confirmed row replaces it without trace; otherwise the
    /// row is inserted. Returns `true` when the timeline changed.
    pub fn reconcile(&mut self, message: Message) -> bool {
        if self.entries.iter().any(|entry| entry.message.id == message.id) {
            return false;
        }

        let confirmed = TimelineEntry {
            message,
            state: DeliveryState::Confirmed,
        };

        if let Some(pending) = self.entries.iter_mut().find(|entry| {
            entry.state == DeliveryState::Pending
                && entry.message.sender_id == confirmed.message.sender_id
                && entry.message.body == confirmed.message.body
                && within_match_window(entry.message.created_at, confirmed.message.created_at)
        }) {
            *pending = confirmed;
        } else {
            self.entries.push(confirmed);
        }
        self.sort();
        true
    }

    /// Marks a pending entry as failed so the UI can offer retry or discard.
    ///
    /// Only the targeted entry is touched; returns `false` if no pending
    /// entry carries `local_id`.
    pub fn mark_failed(&mut self, local_id: Uuid) -> bool {
        match self.entries.iter_mut().find(|entry| {
            entry.message.id == local_id && entry.state == DeliveryState::Pending
        }) {
            Some(entry) => {
                entry.state = DeliveryState::Failed;
                true
            }
            None => false,
        }
    }

    /// Removes a failed entry the user chose to discard.
    ///
    /// Returns `false` if no failed entry carries `local_id`.
    pub fn discard_failed(&mut self, local_id: Uuid) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|entry| !(entry.message.id == local_id && entry.state == DeliveryState::Failed));
        self.entries.len() != before
    }

    fn sort(&mut self) {
        self.entries.sort_by_key(TimelineEntry::sort_key);
    }
}

fn within_match_window(provisional: Timestamp, confirmed: Timestamp) -> bool {
    let window = Duration::seconds(PENDING_MATCH_WINDOW_SECS);
    let delta = confirmed.0 - provisional.0;
    delta.abs() <= window
}
