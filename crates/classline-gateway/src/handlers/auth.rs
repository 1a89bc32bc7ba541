//! `authenticate` handling
//!
//! Validates the access token, binds the session to its user, sends the
//! `ready` snapshot, and announces the online transition to everyone
//! sharing a channel with the user.

use super::error::{HandlerError, HandlerResult};
use super::snapshot;
use crate::connection::{Connection, ConnectionState};
use crate::protocol::{PresenceStatus, ServerEvent, UserSummary};
use crate::server::GatewayState;
use classline_core::Snowflake;
use classline_service::{AuthService, ChannelService, PresenceService};
use std::sync::Arc;
use tracing::{info, instrument};

#[instrument(skip_all, fields(session_id = %connection.session_id()))]
pub async fn authenticate(
    state: &GatewayState,
    connection: &Arc<Connection>,
    token: &str,
) -> HandlerResult<()> {
    if connection.state().await != ConnectionState::Connecting {
        return Err(HandlerError::AlreadyAuthenticated);
    }

    let ctx = state.context();

    let user = AuthService::new(ctx)
        .authenticate(token)
        .await
        .map_err(|e| HandlerError::AuthenticationFailed(e.to_string()))?;

    state
        .registry()
        .bind_user(connection.session_id(), user.id)
        .await;

    let came_online =
        PresenceService::new(ctx).session_connected(user.id, connection.session_id());

    // Snapshot: channels most-recently-active first, each with members,
    // the recipient's unread count, and the last message.
    let channels = ChannelService::new(ctx).list_for_user(user.id).await?;
    let mut snapshots = Vec::with_capacity(channels.len());
    for channel in &channels {
        snapshots.push(snapshot::channel_for(state, channel, user.id).await?);
    }

    let ready = ServerEvent::Ready {
        user: UserSummary::from_user(&user, true),
        session_id: connection.session_id().to_string(),
        channels: snapshots,
    };
    connection
        .send(ready)
        .await
        .map_err(|_| HandlerError::Internal("connection queue closed".to_string()))?;
    connection.activate().await;

    info!(
        user_id = %user.id,
        email = %user.email,
        channels = channels.len(),
        "Session authenticated"
    );

    if came_online {
        broadcast_presence(state, user.id, PresenceStatus::Online).await?;
    }

    Ok(())
}

/// `status_update`: user-declared away/online toggle. Offline only ever
/// comes from disconnecting, so it is rejected here. Broadcast only on an
/// actual change.
#[instrument(skip(state))]
pub async fn status_update(
    state: &GatewayState,
    user_id: Snowflake,
    status: PresenceStatus,
) -> HandlerResult<()> {
    let away = match status {
        PresenceStatus::Away => true,
        PresenceStatus::Online => false,
        PresenceStatus::Offline => {
            return Err(HandlerError::Protocol(
                "offline is declared by disconnecting".to_string(),
            ));
        }
    };

    if PresenceService::new(state.context()).set_away(user_id, away) {
        broadcast_presence(state, user_id, status).await?;
    }

    Ok(())
}

/// Announce a status change to every user sharing a channel
pub async fn broadcast_presence(
    state: &GatewayState,
    user_id: Snowflake,
    status: PresenceStatus,
) -> HandlerResult<()> {
    let audience = ChannelService::new(state.context())
        .presence_audience(user_id)
        .await?;

    let event = ServerEvent::PresenceUpdate { user_id, status };
    state.registry().send_to_users(&audience, &event, None).await;

    Ok(())
}
