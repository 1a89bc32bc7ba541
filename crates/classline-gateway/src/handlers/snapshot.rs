//! Wire snapshot assembly
//!
//! Builds the per-recipient channel and message payloads used by `ready`
//! and `channel_created`. Unread counts are recipient-specific, so a
//! snapshot is always computed for one user.

use super::error::{HandlerError, HandlerResult};
use crate::protocol::{ChannelSnapshot, MessagePayload, UserSummary};
use crate::server::GatewayState;
use classline_core::entities::{Channel, Message, User};
use classline_core::Snowflake;
use classline_service::MessageService;
use std::collections::HashMap;

/// Channel snapshot as seen by one recipient
pub async fn channel_for(
    state: &GatewayState,
    channel: &Channel,
    recipient: Snowflake,
) -> HandlerResult<ChannelSnapshot> {
    let ctx = state.context();

    let mut members = Vec::with_capacity(channel.members.len());
    for &member_id in &channel.members {
        if let Some(member) = ctx.user_repo().find_by_id(member_id).await? {
            let online = ctx.presence_store().is_online(member_id);
            members.push(UserSummary::from_user(&member, online));
        }
    }

    let unread_count = MessageService::new(ctx)
        .unread_count(channel.id, recipient)
        .await?;

    let last_message = latest_message(state, channel.id).await?;

    Ok(ChannelSnapshot::new(
        channel,
        members,
        unread_count,
        last_message,
    ))
}

/// Most recent message of a channel, if any
pub async fn latest_message(
    state: &GatewayState,
    channel_id: Snowflake,
) -> HandlerResult<Option<MessagePayload>> {
    let ctx = state.context();

    let latest_seq = ctx.message_repo().latest_seq(channel_id).await?;
    if latest_seq == 0 {
        return Ok(None);
    }

    let mut tail = ctx
        .message_repo()
        .read_since(channel_id, latest_seq - 1, 1)
        .await?;

    match tail.pop() {
        Some(message) => {
            let sender = load_sender(state, message.sender_id).await?;
            Ok(Some(MessagePayload::new(&message, &sender)))
        }
        None => Ok(None),
    }
}

/// Message payloads with senders resolved, reusing lookups across a batch
pub async fn message_batch(
    state: &GatewayState,
    messages: &[Message],
) -> HandlerResult<Vec<MessagePayload>> {
    let mut senders: HashMap<Snowflake, User> = HashMap::new();
    let mut payloads = Vec::with_capacity(messages.len());

    for message in messages {
        if !senders.contains_key(&message.sender_id) {
            let sender = load_sender(state, message.sender_id).await?;
            senders.insert(message.sender_id, sender);
        }
        let sender = &senders[&message.sender_id];
        payloads.push(MessagePayload::new(message, sender));
    }

    Ok(payloads)
}

pub async fn load_sender(state: &GatewayState, sender_id: Snowflake) -> HandlerResult<User> {
    state
        .context()
        .user_repo()
        .find_by_id(sender_id)
        .await?
        .ok_or_else(|| HandlerError::Internal(format!("sender {sender_id} missing from store")))
}
