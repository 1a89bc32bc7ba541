//! In-memory implementation of ChannelRepository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::instrument;

use classline_core::entities::Channel;
use classline_core::error::DomainError;
use classline_core::traits::{ChannelRepository, RepoResult};
use classline_core::value_objects::Snowflake;

/// In-memory implementation of ChannelRepository
///
/// Direct channels are additionally indexed by their normalized user pair
/// so the one-per-pair invariant has a single authoritative key.
#[derive(Default)]
pub struct MemoryChannelRepository {
    channels: DashMap<Snowflake, Channel>,
    direct_index: DashMap<(Snowflake, Snowflake), Snowflake>,
}

impl MemoryChannelRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pair_key(a: Snowflake, b: Snowflake) -> (Snowflake, Snowflake) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

#[async_trait]
impl ChannelRepository for MemoryChannelRepository {
    #[instrument(skip(self, channel), fields(channel_id = %channel.id))]
    async fn create(&self, channel: &Channel) -> RepoResult<()> {
        if channel.is_direct() {
            let [a, b] = channel.members[..] else {
                return Err(DomainError::ValidationError(
                    "direct channel must have exactly two members".to_string(),
                ));
            };
            self.direct_index.insert(Self::pair_key(a, b), channel.id);
        }
        self.channels.insert(channel.id, channel.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: Snowflake) -> RepoResult<Option<Channel>> {
        Ok(self.channels.get(&id).map(|c| c.clone()))
    }

    #[instrument(skip(self, candidate), fields(channel_id = %candidate.id))]
    async fn find_or_create_direct(&self, candidate: Channel) -> RepoResult<(Channel, bool)> {
        let [a, b] = candidate.members[..] else {
            return Err(DomainError::ValidationError(
                "direct channel must have exactly two members".to_string(),
            ));
        };

        // The entry guard holds the index shard, so two racing callers for
        // the same pair serialize here and only one installs a channel.
        match self.direct_index.entry(Self::pair_key(a, b)) {
            Entry::Occupied(existing) => {
                let id = *existing.get();
                drop(existing);
                match self.channels.get(&id) {
                    Some(channel) => Ok((channel.clone(), false)),
                    None => Err(DomainError::ChannelNotFound(id)),
                }
            }
            Entry::Vacant(slot) => {
                self.channels.insert(candidate.id, candidate.clone());
                slot.insert(candidate.id);
                Ok((candidate, true))
            }
        }
    }

    async fn find_by_member(&self, user_id: Snowflake) -> RepoResult<Vec<Channel>> {
        Ok(self
            .channels
            .iter()
            .filter(|entry| entry.is_member(user_id))
            .map(|entry| entry.clone())
            .collect())
    }

    #[instrument(skip(self))]
    async fn add_member(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<(Channel, bool)> {
        match self.channels.get_mut(&channel_id) {
            Some(mut channel) => {
                let added = !channel.is_member(user_id);
                if added {
                    channel.members.push(user_id);
                }
                Ok((channel.clone(), added))
            }
            None => Err(DomainError::ChannelNotFound(channel_id)),
        }
    }

    #[instrument(skip(self))]
    async fn remove_member(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> RepoResult<(Channel, bool)> {
        match self.channels.get_mut(&channel_id) {
            Some(mut channel) => {
                let before = channel.members.len();
                channel.members.retain(|&m| m != user_id);
                Ok((channel.clone(), channel.members.len() < before))
            }
            None => Err(DomainError::ChannelNotFound(channel_id)),
        }
    }

    async fn is_member(&self, channel_id: Snowflake, user_id: Snowflake) -> RepoResult<bool> {
        match self.channels.get(&channel_id) {
            Some(channel) => Ok(channel.is_member(user_id)),
            None => Err(DomainError::ChannelNotFound(channel_id)),
        }
    }

    async fn touch(&self, channel_id: Snowflake, at: DateTime<Utc>) -> RepoResult<()> {
        match self.channels.get_mut(&channel_id) {
            Some(mut channel) => {
                channel.touch(at);
                Ok(())
            }
            None => Err(DomainError::ChannelNotFound(channel_id)),
        }
    }
}
