//! Repository services over the storage collaborator.
//!
//! One service per entity family, each a thin pass-through to the hosted
//! CRUD surface with validation at the boundary.

pub mod conversation_service;
pub mod message_service;
pub mod notification_service;
pub mod post_service;
pub mod profile_service;
pub mod wallet_service;

pub use conversation_service::ConversationService;
pub use message_service::MessageService;
pub use notification_service::NotificationService;
pub use post_service::PostService;
pub use profile_service::ProfileService;
pub use wallet_service::WalletService;
