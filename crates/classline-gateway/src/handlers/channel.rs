//! Channel creation and the contact roster

use super::error::{HandlerError, HandlerResult};
use super::snapshot;
use crate::connection::Connection;
use crate::protocol::{ServerEvent, UserSummary};
use crate::server::GatewayState;
use classline_core::Snowflake;
use classline_service::ChannelService;
use std::sync::Arc;
use tracing::{info, instrument};

/// `create_direct_channel`: idempotent per user pair. On a fresh channel
/// every member is notified; on reuse only the requester is.
#[instrument(skip(state, connection))]
pub async fn create_direct(
    state: &GatewayState,
    connection: &Arc<Connection>,
    user_id: Snowflake,
    target_user_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let (channel, created) = ChannelService::new(ctx)
        .open_direct(user_id, target_user_id)
        .await?;

    if created {
        info!(channel_id = %channel.id, peer = %target_user_id, "Direct channel created");

        for &member in &channel.members {
            let event = ServerEvent::ChannelCreated {
                channel: snapshot::channel_for(state, &channel, member).await?,
                created: true,
            };
            state.registry().send_to_user(member, &event).await;
        }
    } else {
        let event = ServerEvent::ChannelCreated {
            channel: snapshot::channel_for(state, &channel, user_id).await?,
            created: false,
        };
        connection
            .send(event)
            .await
            .map_err(|_| HandlerError::Internal("connection queue closed".to_string()))?;
    }

    Ok(())
}

/// `create_group_channel`: educators only; every member is notified
#[instrument(skip(state, description, member_ids), fields(member_count = member_ids.len()))]
pub async fn create_group(
    state: &GatewayState,
    user_id: Snowflake,
    name: &str,
    description: Option<String>,
    member_ids: Vec<Snowflake>,
) -> HandlerResult<()> {
    let ctx = state.context();

    let creator = snapshot::load_sender(state, user_id).await?;
    let channel = ChannelService::new(ctx)
        .create_group(&creator, name, description, member_ids)
        .await?;

    info!(
        channel_id = %channel.id,
        members = channel.members.len(),
        "Group channel created"
    );

    for &member in &channel.members {
        let event = ServerEvent::ChannelCreated {
            channel: snapshot::channel_for(state, &channel, member).await?,
            created: true,
        };
        state.registry().send_to_user(member, &event).await;
    }

    Ok(())
}

/// `add_channel_member`: channel creator only. The new member gets the
/// full channel snapshot; existing members get a `member_added` notice.
/// Re-adding a member only acks the requester.
#[instrument(skip(state, connection))]
pub async fn add_member(
    state: &GatewayState,
    connection: &Arc<Connection>,
    actor_id: Snowflake,
    channel_id: Snowflake,
    user_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let (channel, added) = ChannelService::new(ctx)
        .add_member(actor_id, channel_id, user_id)
        .await?;

    let joined = snapshot::load_sender(state, user_id).await?;
    let notice = ServerEvent::MemberAdded {
        channel_id,
        user: UserSummary::from_user(&joined, ctx.presence_store().is_online(joined.id)),
    };

    if !added {
        return connection
            .send(notice)
            .await
            .map_err(|_| HandlerError::Internal("connection queue closed".to_string()));
    }

    info!(channel_id = %channel_id, user_id = %user_id, "Member added to channel");

    let welcome = ServerEvent::ChannelCreated {
        channel: snapshot::channel_for(state, &channel, user_id).await?,
        created: true,
    };
    state.registry().send_to_user(user_id, &welcome).await;

    let others: Vec<Snowflake> = channel
        .members
        .iter()
        .copied()
        .filter(|&m| m != user_id)
        .collect();
    state.registry().send_to_users(&others, &notice, None).await;

    Ok(())
}

/// `remove_channel_member`: channel creator only. The remaining members
/// and the removed user all get a `member_removed` notice.
#[instrument(skip(state))]
pub async fn remove_member(
    state: &GatewayState,
    actor_id: Snowflake,
    channel_id: Snowflake,
    user_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let channel = ChannelService::new(ctx)
        .remove_member(actor_id, channel_id, user_id)
        .await?;

    info!(channel_id = %channel_id, user_id = %user_id, "Member removed from channel");

    let mut audience = channel.members.clone();
    audience.push(user_id);

    let event = ServerEvent::MemberRemoved {
        channel_id,
        user_id,
    };
    state.registry().send_to_users(&audience, &event, None).await;

    Ok(())
}

/// `list_contacts`: everyone but the requester, with live status
#[instrument(skip(state, connection))]
pub async fn list_contacts(
    state: &GatewayState,
    connection: &Arc<Connection>,
    user_id: Snowflake,
) -> HandlerResult<()> {
    let ctx = state.context();

    let users = ctx.user_repo().list_others(user_id).await?;
    let summaries = users
        .iter()
        .map(|u| UserSummary::from_user(u, ctx.presence_store().is_online(u.id)))
        .collect();

    connection
        .send(ServerEvent::Contacts { users: summaries })
        .await
        .map_err(|_| HandlerError::Internal("connection queue closed".to_string()))
}
