//! Domain entities - core business objects

mod channel;
mod message;
mod user;

pub use channel::{Channel, ChannelKind};
pub use message::{Message, MAX_CONTENT_LEN};
pub use user::{User, UserRole};
