//! Presence service
//!
//! Online transitions driven by session lifecycle and typing indicators
//! with server-side expiry.

use classline_core::Snowflake;
use tracing::{debug, info, instrument};

use super::channel::ChannelService;
use super::context::ServiceContext;
use super::error::ServiceResult;

/// Presence service
pub struct PresenceService<'a> {
    ctx: &'a ServiceContext,
}

/// What a session disconnect changed, so the gateway knows what to announce
#[derive(Debug, Default)]
pub struct DisconnectOutcome {
    /// True if this was the user's last session
    pub went_offline: bool,
    /// Channels where the user's typing indicator was force-cleared
    pub stopped_typing_in: Vec<Snowflake>,
}

impl<'a> PresenceService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Record a connected session. Returns true if the user came online.
    #[instrument(skip(self))]
    pub fn session_connected(&self, user_id: Snowflake, session_id: &str) -> bool {
        let came_online = self
            .ctx
            .presence_store()
            .session_connected(user_id, session_id);
        if came_online {
            info!(user_id = %user_id, "User came online");
        } else {
            debug!(user_id = %user_id, "Additional session connected");
        }
        came_online
    }

    /// Record a disconnected session. If it was the user's last session,
    /// their typing indicators are cleared too.
    #[instrument(skip(self))]
    pub fn session_disconnected(&self, user_id: Snowflake, session_id: &str) -> DisconnectOutcome {
        let went_offline = self
            .ctx
            .presence_store()
            .session_disconnected(user_id, session_id);

        let stopped_typing_in = if went_offline {
            info!(user_id = %user_id, "User went offline");
            self.ctx.typing_tracker().stop_all(user_id)
        } else {
            Vec::new()
        };

        DisconnectOutcome {
            went_offline,
            stopped_typing_in,
        }
    }

    #[must_use]
    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.ctx.presence_store().is_online(user_id)
    }

    /// Mark the user away or back. Returns true if the visible status
    /// changed, meaning observers should be notified.
    #[instrument(skip(self))]
    pub fn set_away(&self, user_id: Snowflake, away: bool) -> bool {
        let changed = self.ctx.presence_store().set_away(user_id, away);
        if changed {
            info!(user_id = %user_id, away, "Presence status changed");
        }
        changed
    }

    #[must_use]
    pub fn is_away(&self, user_id: Snowflake) -> bool {
        self.ctx.presence_store().is_away(user_id)
    }

    /// Mark a user as typing in a channel they belong to. Returns true if
    /// observers should be notified (the indicator was not already live).
    #[instrument(skip(self))]
    pub async fn typing_started(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<bool> {
        ChannelService::new(self.ctx)
            .require_membership(channel_id, user_id)
            .await?;

        Ok(self
            .ctx
            .typing_tracker()
            .start(channel_id, user_id, self.ctx.typing_ttl()))
    }

    /// Explicitly clear a typing indicator. Returns true if it was live.
    #[instrument(skip(self))]
    pub async fn typing_stopped(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<bool> {
        ChannelService::new(self.ctx)
            .require_membership(channel_id, user_id)
            .await?;

        Ok(self.ctx.typing_tracker().stop(channel_id, user_id))
    }

    /// Expire stale typing indicators, returning the (channel, user) pairs
    /// whose observers need a stop notification
    pub fn expire_typing(&self) -> Vec<(Snowflake, Snowflake)> {
        self.ctx.typing_tracker().sweep()
    }

    /// Who is typing in a channel right now, with display names resolved
    #[instrument(skip(self))]
    pub async fn typing_users(
        &self,
        channel_id: Snowflake,
    ) -> ServiceResult<Vec<(Snowflake, String)>> {
        let ids = self.ctx.typing_tracker().typing_users(channel_id);
        let mut users = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(user) = self.ctx.user_repo().find_by_id(id).await? {
                users.push((id, user.display_name));
            }
        }
        Ok(users)
    }
}
