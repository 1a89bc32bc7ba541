//! Inbound event routing
//!
//! Parses incoming envelopes and routes them to the right handler. Every
//! failure becomes an error envelope to the originating connection; only
//! authentication misuse closes the socket.

mod auth;
mod channel;
mod error;
mod message;
mod snapshot;
mod typing;

pub use auth::broadcast_presence;
pub use error::{HandlerError, HandlerResult};
pub use typing::broadcast_stopped;

use crate::connection::Connection;
use crate::protocol::ClientEvent;
use crate::server::GatewayState;
use classline_core::Snowflake;
use std::sync::Arc;

/// Routes client events to handlers
pub struct EventRouter;

impl EventRouter {
    /// Handle one raw text frame from the client
    pub async fn dispatch(
        state: &GatewayState,
        connection: &Arc<Connection>,
        raw: &str,
    ) -> HandlerResult<()> {
        let event: ClientEvent = serde_json::from_str(raw)
            .map_err(|e| HandlerError::Protocol(format!("invalid envelope: {e}")))?;

        tracing::trace!(
            session_id = %connection.session_id(),
            frame_len = raw.len(),
            "Client event received"
        );

        match event {
            ClientEvent::Authenticate { token } => {
                auth::authenticate(state, connection, &token).await
            }
            ClientEvent::Heartbeat => {
                connection
                    .send(crate::protocol::ServerEvent::HeartbeatAck)
                    .await
                    .map_err(|_| HandlerError::Internal("connection queue closed".to_string()))
            }
            ClientEvent::SendMessage {
                channel_id,
                content,
            } => {
                let user_id = Self::require_active(connection).await?;
                message::send_message(state, user_id, channel_id, &content).await
            }
            ClientEvent::TypingStarted { channel_id } => {
                let user_id = Self::require_active(connection).await?;
                typing::typing_started(state, user_id, channel_id).await
            }
            ClientEvent::TypingStopped { channel_id } => {
                let user_id = Self::require_active(connection).await?;
                typing::typing_stopped(state, user_id, channel_id).await
            }
            ClientEvent::SelectChannel { channel_id } => {
                let user_id = Self::require_active(connection).await?;
                message::select_channel(state, connection, user_id, channel_id).await
            }
            ClientEvent::CreateDirectChannel { target_user_id } => {
                let user_id = Self::require_active(connection).await?;
                channel::create_direct(state, connection, user_id, target_user_id).await
            }
            ClientEvent::CreateGroupChannel {
                name,
                description,
                member_ids,
            } => {
                let user_id = Self::require_active(connection).await?;
                channel::create_group(state, user_id, &name, description, member_ids).await
            }
            ClientEvent::AddChannelMember {
                channel_id,
                user_id,
            } => {
                let actor_id = Self::require_active(connection).await?;
                channel::add_member(state, connection, actor_id, channel_id, user_id).await
            }
            ClientEvent::RemoveChannelMember {
                channel_id,
                user_id,
            } => {
                let actor_id = Self::require_active(connection).await?;
                channel::remove_member(state, actor_id, channel_id, user_id).await
            }
            ClientEvent::StatusUpdate { status } => {
                let user_id = Self::require_active(connection).await?;
                auth::status_update(state, user_id, status).await
            }
            ClientEvent::FetchHistory {
                channel_id,
                after_seq,
                limit,
            } => {
                let user_id = Self::require_active(connection).await?;
                message::fetch_history(state, connection, user_id, channel_id, after_seq, limit)
                    .await
            }
            ClientEvent::ListContacts => {
                let user_id = Self::require_active(connection).await?;
                channel::list_contacts(state, connection, user_id).await
            }
        }
    }

    /// Channel-scoped events require an `Active` authenticated connection
    async fn require_active(connection: &Arc<Connection>) -> HandlerResult<Snowflake> {
        if !connection.is_active().await {
            return Err(HandlerError::Unauthorized);
        }
        connection
            .user_id()
            .await
            .ok_or(HandlerError::Unauthorized)
    }
}
