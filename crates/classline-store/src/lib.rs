//! # classline-store
//!
//! Storage layer implementing the repository traits from `classline-core`
//! with process-local maps, plus the runtime presence state the gateway
//! reads and writes (online sessions, typing deadlines, read cursors).
//!
//! The repositories are the seam a durable engine would plug into; nothing
//! above this crate knows how messages or channels are stored.

pub mod memory;
pub mod presence;

pub use memory::{MemoryChannelRepository, MemoryMessageRepository, MemoryUserRepository};
pub use presence::{PresenceStore, ReadStateStore, TypingTracker};
