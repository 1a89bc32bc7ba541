//! # classline-core
//!
//! Domain layer containing entities, value objects, repository traits, and domain errors.
//! This crate has zero dependencies on infrastructure (storage, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{Channel, ChannelKind, Message, User, UserRole};
pub use error::DomainError;
pub use traits::{ChannelRepository, MessageRepository, RepoResult, UserRepository};
pub use value_objects::{Snowflake, SnowflakeGenerator, SnowflakeParseError};
