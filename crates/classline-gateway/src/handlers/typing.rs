//! Typing indicator events
//!
//! Indicators are broadcast to the other members only; the typist never
//! receives their own indicator back. Redundant starts and stops are
//! absorbed without a broadcast.

use super::error::HandlerResult;
use super::snapshot;
use crate::protocol::ServerEvent;
use crate::server::GatewayState;
use classline_core::Snowflake;
use classline_service::{ChannelService, PresenceService};
use tracing::instrument;

#[instrument(skip(state))]
pub async fn typing_started(
    state: &GatewayState,
    user_id: Snowflake,
    channel_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let newly_typing = PresenceService::new(ctx)
        .typing_started(channel_id, user_id)
        .await?;
    if !newly_typing {
        return Ok(());
    }

    let channel = ChannelService::new(ctx)
        .require_membership(channel_id, user_id)
        .await?;
    let typist = snapshot::load_sender(state, user_id).await?;

    let event = ServerEvent::UserTyping {
        channel_id,
        user_id,
        display_name: typist.display_name,
    };
    state
        .registry()
        .send_to_users(&channel.members, &event, Some(user_id))
        .await;

    Ok(())
}

#[instrument(skip(state))]
pub async fn typing_stopped(
    state: &GatewayState,
    user_id: Snowflake,
    channel_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let was_typing = PresenceService::new(ctx)
        .typing_stopped(channel_id, user_id)
        .await?;
    if !was_typing {
        return Ok(());
    }

    broadcast_stopped(state, channel_id, user_id).await
}

/// Broadcast `user_stopped_typing` to the other members. Also used by the
/// sweeper and by disconnect cleanup.
pub async fn broadcast_stopped(
    state: &GatewayState,
    channel_id: Snowflake,
    user_id: Snowflake,
) -> HandlerResult<()> {
    let channel = state
        .context()
        .channel_repo()
        .find_by_id(channel_id)
        .await?;

    let Some(channel) = channel else {
        return Ok(());
    };

    let event = ServerEvent::UserStoppedTyping {
        channel_id,
        user_id,
    };
    state
        .registry()
        .send_to_users(&channel.members, &event, Some(user_id))
        .await;

    Ok(())
}
