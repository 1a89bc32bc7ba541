//! Message service
//!
//! Message validation and append, history catch-up, and unread counts
//! derived from read cursors.

use classline_core::entities::{Message, MAX_CONTENT_LEN};
use classline_core::{DomainError, Snowflake};
use tracing::{info, instrument};

use super::channel::ChannelService;
use super::context::ServiceContext;
use super::error::ServiceResult;

/// Default history page size
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
/// Upper bound on a single history request
pub const MAX_HISTORY_LIMIT: usize = 200;

/// Message service
pub struct MessageService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MessageService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Validate and append a message to a channel the sender belongs to.
    /// Returns the stored message with its assigned seq. Sending marks the
    /// channel read for the sender up to their own message.
    #[instrument(skip(self, content), fields(content_len = content.len()))]
    pub async fn send(
        &self,
        channel_id: Snowflake,
        sender_id: Snowflake,
        content: &str,
    ) -> ServiceResult<Message> {
        let content = content.trim();
        if content.is_empty() {
            return Err(DomainError::EmptyContent.into());
        }
        if content.chars().count() > MAX_CONTENT_LEN {
            return Err(DomainError::ContentTooLong { max: MAX_CONTENT_LEN }.into());
        }

        ChannelService::new(self.ctx)
            .require_membership(channel_id, sender_id)
            .await?;

        let draft = Message::new(
            self.ctx.generate_id(),
            channel_id,
            sender_id,
            content.to_string(),
        );
        let message = self.ctx.message_repo().append(draft).await?;

        self.ctx
            .channel_repo()
            .touch(channel_id, message.sent_at)
            .await?;
        self.ctx
            .read_state()
            .mark_read(sender_id, channel_id, message.seq);

        info!(message_id = %message.id, channel_id = %channel_id, seq = message.seq, "Message appended");

        Ok(message)
    }

    /// Messages after `after_seq`, ascending, membership-gated
    #[instrument(skip(self))]
    pub async fn history(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
        after_seq: u64,
        limit: Option<usize>,
    ) -> ServiceResult<Vec<Message>> {
        ChannelService::new(self.ctx)
            .require_membership(channel_id, user_id)
            .await?;

        let limit = limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
        Ok(self
            .ctx
            .message_repo()
            .read_since(channel_id, after_seq, limit)
            .await?)
    }

    /// Mark a channel fully read for a user, returning the cursor seq
    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<u64> {
        ChannelService::new(self.ctx)
            .require_membership(channel_id, user_id)
            .await?;

        let latest = self.ctx.message_repo().latest_seq(channel_id).await?;
        self.ctx.read_state().mark_read(user_id, channel_id, latest);
        Ok(latest)
    }

    /// Unread count for one channel, derived from the user's cursor
    #[instrument(skip(self))]
    pub async fn unread_count(
        &self,
        channel_id: Snowflake,
        user_id: Snowflake,
    ) -> ServiceResult<u64> {
        let cursor = self.ctx.read_state().last_read(user_id, channel_id);
        Ok(self
            .ctx
            .message_repo()
            .count_since(channel_id, cursor)
            .await?)
    }

}
