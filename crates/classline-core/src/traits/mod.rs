//! Repository traits (ports)

mod repositories;

pub use repositories::{ChannelRepository, MessageRepository, RepoResult, UserRepository};
