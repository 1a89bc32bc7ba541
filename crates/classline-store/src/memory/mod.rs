//! In-memory repository implementations

mod channels;
mod messages;
mod users;

pub use channels::MemoryChannelRepository;
pub use messages::MemoryMessageRepository;
pub use users::MemoryUserRepository;
