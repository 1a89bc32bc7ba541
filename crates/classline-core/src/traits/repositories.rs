//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs; the storage layer provides the
//! implementation. The default implementations are process-local, but
//! nothing here assumes a particular engine.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Channel, Message, User};
use crate::error::DomainError;
use crate::value_objects::Snowflake;

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// User Repository
// ============================================================================

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Create a new user with its credential hash
    async fn create(&self, user: &User, password_hash: &str) -> RepoResult<()>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>>;

    async fn email_exists(&self, email: &str) -> RepoResult<bool>;

    /// Password hash for credential verification
    async fn get_password_hash(&self, id: Snowflake) -> RepoResult<Option<String>>;

    /// All users except the given one, for the contact roster
    async fn list_others(&self, user_id: Snowflake) -> RepoResult<Vec<User>>;
}

// ============================================================================
// Channel Repository
// ============================================================================

#[async_trait]
pub trait ChannelRepository: Send + Sync {
    async fn create(&self, channel: &Channel) -> RepoResult<()>;

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Channel>>;

    /// Fetch the direct channel for `candidate`'s member pair, or install
    /// `candidate` as that pair's channel. Atomic per unordered pair:
    /// two racing callers get the same channel back, exactly one of them
    /// with `true` (created). The one-direct-channel-per-pair invariant is
    /// enforced here, not by callers.
    async fn find_or_create_direct(&self, candidate: Channel) -> RepoResult<(Channel, bool)>;

    /// All channels the user belongs to
    async fn find_by_member(&self, user_id: Snowflake) -> RepoResult<Vec<Channel>>;

    /// Add a user to the channel's member list. Returns the updated
    /// channel and whether the user was newly added.
    async fn add_member(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<(Channel, bool)>;

    /// Remove a user from the channel's member list. Returns the updated
    /// channel and whether the user was a member.
    async fn remove_member(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<(Channel, bool)>;

    async fn is_member(&self, channel_id: Snowflake, user_id: Snowflake) -> RepoResult<bool>;

    /// Bump the channel's last-activity timestamp
    async fn touch(&self, channel_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()>;
}

// ============================================================================
// Message Repository
// ============================================================================

#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Append a message to its channel log.
    ///
    /// The log assigns `seq`: dense, starting at 1, strictly increasing per
    /// channel. Appends to one channel serialize; two appends never observe
    /// the same seq. Returns the stored message.
    async fn append(&self, message: Message) -> RepoResult<Message>;

    /// Messages with seq greater than `after_seq`, ascending, up to `limit`
    async fn read_since(
        &self,
        channel_id: Snowflake,
        after_seq: u64,
        limit: usize,
    ) -> RepoResult<Vec<Message>>;

    /// Highest assigned seq in the channel, 0 for an empty log
    async fn latest_seq(&self, channel_id: Snowflake) -> RepoResult<u64>;

    /// Number of messages with seq greater than `after_seq`
    async fn count_since(&self, channel_id: Snowflake, after_seq: u64) -> RepoResult<u64>;
}
