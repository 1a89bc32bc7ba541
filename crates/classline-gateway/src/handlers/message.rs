//! Message events: send, history catch-up, channel selection
//!
//! `send_message` is the fanout hot path: the append is authoritative and
//! ordered by the store; delivery enqueues to every member session,
//! including the sender's, so all of them observe the same order.

use super::error::{HandlerError, HandlerResult};
use super::snapshot;
use crate::connection::Connection;
use crate::protocol::{MessagePayload, ServerEvent};
use crate::server::GatewayState;
use classline_core::Snowflake;
use classline_service::{ChannelService, MessageService};
use std::sync::Arc;
use tracing::{debug, instrument};

#[instrument(skip(state, content), fields(content_len = content.len()))]
pub async fn send_message(
    state: &GatewayState,
    sender_id: Snowflake,
    channel_id: Snowflake,
    content: &str,
) -> HandlerResult<()> {
    let ctx = state.context();

    let message = MessageService::new(ctx)
        .send(channel_id, sender_id, content)
        .await?;

    let channel = ChannelService::new(ctx)
        .require_membership(channel_id, sender_id)
        .await?;
    let sender = snapshot::load_sender(state, sender_id).await?;

    let event = ServerEvent::NewMessage {
        channel_id,
        message: MessagePayload::new(&message, &sender),
    };

    // Everyone gets the broadcast, the sender included; the sender's own
    // copy is the authoritative server-assigned message.
    let sent = state
        .registry()
        .send_to_users(&channel.members, &event, None)
        .await;

    // Members currently viewing the channel have already seen the message;
    // advance their cursor so it never counts as unread. The sender's
    // cursor was advanced by the send itself.
    for &member in &channel.members {
        if member != sender_id && state.registry().is_viewing(member, channel_id).await {
            MessageService::new(ctx).mark_read(channel_id, member).await?;
        }
    }

    debug!(
        message_id = %message.id,
        seq = message.seq,
        sessions = sent,
        "Message fanned out"
    );

    Ok(())
}

#[instrument(skip(state, connection))]
pub async fn fetch_history(
    state: &GatewayState,
    connection: &Arc<Connection>,
    user_id: Snowflake,
    channel_id: Snowflake,
    after_seq: u64,
    limit: Option<usize>,
) -> HandlerResult<()> {
    let messages = MessageService::new(state.context())
        .history(channel_id, user_id, after_seq, limit)
        .await?;

    let payloads = snapshot::message_batch(state, &messages).await?;

    connection
        .send(ServerEvent::History {
            channel_id,
            messages: payloads,
        })
        .await
        .map_err(|_| HandlerError::Internal("connection queue closed".to_string()))
}

/// `select_channel`: this session is now viewing the channel, which marks
/// it read for the user
#[instrument(skip(state, connection))]
pub async fn select_channel(
    state: &GatewayState,
    connection: &Arc<Connection>,
    user_id: Snowflake,
    channel_id: Snowflake,
) -> HandlerResult<()> {
    let cursor = MessageService::new(state.context())
        .mark_read(channel_id, user_id)
        .await?;

    connection.set_viewing(Some(channel_id)).await;

    debug!(cursor, "Channel selected and marked read");

    Ok(())
}
