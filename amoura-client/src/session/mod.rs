//! Messaging session state: the optimistic timeline, the realtime
//! reconciliation listener, and the chat session that composes them.

pub mod chat;
pub mod listener;
pub mod timeline;

pub use chat::ChatSession;
pub use listener::{ConversationListener, ListenerState};
pub use timeline::{MessageTimeline, TimelineEntry};
