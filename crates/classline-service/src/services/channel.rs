//! Channel service
//!
//! Direct channel idempotency and educator-gated group creation.

use classline_core::entities::{Channel, User};
use classline_core::{DomainError, Snowflake};
use tracing::{info, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Channel service
pub struct ChannelService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> ChannelService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// All channels the user belongs to, most recently active first
    #[instrument(skip(self))]
    pub async fn list_for_user(&self, user_id: Snowflake) -> ServiceResult<Vec<Channel>> {
        let mut channels = self.ctx.channel_repo().find_by_member(user_id).await?;
        channels.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(channels)
    }

    /// Open a direct channel with another user, returning the existing one
    /// if the pair already has one. Returns the channel and whether it was
    /// newly created.
    #[instrument(skip(self))]
    pub async fn open_direct(
        &self,
        user_id: Snowflake,
        peer_id: Snowflake,
    ) -> ServiceResult<(Channel, bool)> {
        if user_id == peer_id {
            return Err(DomainError::SelfDirectChannel.into());
        }

        self.ctx
            .user_repo()
            .find_by_id(peer_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", peer_id.to_string()))?;

        // Get-or-create is atomic in the repository; racing requests from
        // both peers converge on one channel.
        let candidate = Channel::new_direct(self.ctx.generate_id(), user_id, peer_id);
        let (channel, created) = self
            .ctx
            .channel_repo()
            .find_or_create_direct(candidate)
            .await?;

        if created {
            info!(channel_id = %channel.id, peer_id = %peer_id, "Direct channel created");
        }

        Ok((channel, created))
    }

    /// Create a named group channel. Only educators may do this; the
    /// creator is always a member, and unknown member ids are dropped.
    #[instrument(skip(self, member_ids), fields(member_count = member_ids.len()))]
    pub async fn create_group(
        &self,
        creator: &User,
        name: &str,
        description: Option<String>,
        member_ids: Vec<Snowflake>,
    ) -> ServiceResult<Channel> {
        if !creator.role.can_create_groups() {
            return Err(DomainError::NotEducator.into());
        }

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::EmptyChannelName.into());
        }
        if name.len() > 100 {
            return Err(ServiceError::validation("Channel name must be at most 100 characters"));
        }

        let description = description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        if description.as_ref().is_some_and(|d| d.len() > 500) {
            return Err(ServiceError::validation(
                "Channel description must be at most 500 characters",
            ));
        }

        let mut members = Vec::with_capacity(member_ids.len());
        for member_id in member_ids {
            if self.ctx.user_repo().find_by_id(member_id).await?.is_some() {
                members.push(member_id);
            }
        }

        let channel = Channel::new_group(
            self.ctx.generate_id(),
            name.to_string(),
            description,
            creator.id,
            members,
        );
        self.ctx.channel_repo().create(&channel).await?;

        info!(
            channel_id = %channel.id,
            creator_id = %creator.id,
            members = channel.members.len(),
            "Group channel created"
        );

        Ok(channel)
    }

    /// Add a user to a group channel. Only the channel creator may manage
    /// membership; adding an existing member is a no-op. Returns the
    /// channel and whether the user was newly added.
    #[instrument(skip(self))]
    pub async fn add_member(
        &self,
        actor_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<(Channel, bool)> {
        self.require_creator(actor_id, channel_id).await?;

        self.ctx
            .user_repo()
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::not_found("User", user_id.to_string()))?;

        let (channel, added) = self
            .ctx
            .channel_repo()
            .add_member(channel_id, user_id)
            .await?;

        if added {
            info!(channel_id = %channel_id, user_id = %user_id, "Member added");
        }

        Ok((channel, added))
    }

    /// Remove a user from a group channel. Only the channel creator may do
    /// this, and the creator themselves cannot be removed.
    #[instrument(skip(self))]
    pub async fn remove_member(
        &self,
        actor_id: Snowflake,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Channel> {
        let channel = self.require_creator(actor_id, channel_id).await?;

        if user_id == channel.created_by {
            return Err(ServiceError::validation(
                "The channel creator cannot be removed",
            ));
        }

        let (channel, removed) = self
            .ctx
            .channel_repo()
            .remove_member(channel_id, user_id)
            .await?;

        if !removed {
            return Err(ServiceError::not_found("Member", user_id.to_string()));
        }

        info!(channel_id = %channel_id, user_id = %user_id, "Member removed");
        Ok(channel)
    }

    /// Membership mutation gate: the channel must be a group and the actor
    /// must be its creator
    async fn require_creator(
        &self,
        actor_id: Snowflake,
        channel_id: Snowflake,
    ) -> ServiceResult<Channel> {
        let channel = self
            .ctx
            .channel_repo()
            .find_by_id(channel_id)
            .await?
            .ok_or(DomainError::ChannelNotFound(channel_id))?;

        if channel.is_direct() {
            return Err(ServiceError::validation(
                "Direct channel membership is fixed",
            ));
        }
        if channel.created_by != actor_id {
            return Err(ServiceError::permission_denied(
                "only the channel creator can manage members",
            ));
        }

        Ok(channel)
    }

    /// Load a channel and require the user to be a member
    #[instrument(skip(self))]
    pub async fn require_membership(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<Channel> {
        let channel = self
            .ctx
            .channel_repo()
            .find_by_id(channel_id)
            .await?
            .ok_or(DomainError::ChannelNotFound(channel_id))?;

        if !channel.is_member(user_id) {
            return Err(DomainError::NotMember(channel_id).into());
        }

        Ok(channel)
    }

    /// Users who share at least one channel with the given user. This is
    /// the audience for their presence updates.
    #[instrument(skip(self))]
    pub async fn presence_audience(&self, user_id: Snowflake) -> ServiceResult<Vec<Snowflake>> {
        let channels = self.ctx.channel_repo().find_by_member(user_id).await?;
        let mut audience: Vec<Snowflake> = channels
            .iter()
            .flat_map(|c| c.members.iter().copied())
            .filter(|&m| m != user_id)
            .collect();
        audience.sort_unstable();
        audience.dedup();
        Ok(audience)
    }
}
