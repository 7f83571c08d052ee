pub mod conversation;
pub mod errors;
pub mod message;
pub mod notification;
pub mod post;
pub mod realtime;
pub mod timestamp;
pub mod user;
pub mod wallet;

pub use conversation::{Conversation, ConversationKey};
pub use errors::{ClientError, ClientResult};
pub use message::{DeliveryState, Message, NewMessage};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use post::{NewPost, Post};
pub use realtime::{ChangeEvent, ChangeFilter, ChangeOp};
pub use timestamp::Timestamp;
pub use user::{Profile, ProfileUpdate};
pub use wallet::{NewTransaction, TransactionKind, WalletTransaction, balance_cents};
