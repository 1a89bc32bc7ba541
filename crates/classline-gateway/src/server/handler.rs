//! WebSocket lifecycle
//!
//! Accepts the upgrade, runs the read / write / liveness tasks, and on
//! disconnect announces the presence and typing fallout.

use crate::connection::{Connection, ConnectionState, Outbound};
use crate::handlers::{broadcast_presence, broadcast_stopped, EventRouter};
use crate::protocol::{CloseCode, PresenceStatus, ServerEvent};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{CloseFrame, Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;

/// Outbound queue depth per connection
const MESSAGE_BUFFER_SIZE: usize = 100;

/// WebSocket upgrade endpoint
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(state, socket))
}

async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let session_id = uuid::Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::channel::<Outbound>(MESSAGE_BUFFER_SIZE);

    let connection = state.registry().register(session_id.clone(), tx);

    tracing::info!(session_id = %session_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // First frame on every socket
    let hello = ServerEvent::Hello {
        heartbeat_interval_ms: state.config().presence.heartbeat_interval_ms,
    };
    if let Ok(json) = hello.to_json() {
        if ws_sink.send(Message::Text(json)).await.is_err() {
            tracing::warn!(session_id = %session_id, "Failed to send hello");
            cleanup_connection(&state, &connection).await;
            return;
        }
    }

    let state_recv = state.clone();
    let connection_recv = connection.clone();

    // Read inbound frames and route them
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    connection_recv.record_activity().await;
                    if let Err(err) =
                        EventRouter::dispatch(&state_recv, &connection_recv, &text).await
                    {
                        if let Some(code) = err.close_code() {
                            tracing::debug!(
                                session_id = %connection_recv.session_id(),
                                close_code = %code,
                                "Closing connection"
                            );
                            let _ = connection_recv.close(code).await;
                            return;
                        }

                        // Failures stay on the originating connection
                        tracing::debug!(
                            session_id = %connection_recv.session_id(),
                            code = err.code(),
                            error = %err,
                            "Client event rejected"
                        );
                        if connection_recv.send(err.to_event()).await.is_err() {
                            return;
                        }
                    }
                }
                Ok(Message::Binary(_)) => {
                    let event =
                        ServerEvent::error("PROTOCOL_ERROR", "binary frames are not supported");
                    if connection_recv.send(event).await.is_err() {
                        return;
                    }
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    connection_recv.record_activity().await;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(
                        session_id = %connection_recv.session_id(),
                        "Client closed connection"
                    );
                    return;
                }
                Err(e) => {
                    tracing::warn!(
                        session_id = %connection_recv.session_id(),
                        error = %e,
                        "WebSocket error"
                    );
                    return;
                }
            }
        }
    });

    let session_id_send = session_id.clone();

    // Drain the outbound queue into the socket
    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match frame {
                Outbound::Event(event) => {
                    let Ok(json) = event.to_json() else {
                        continue;
                    };
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        tracing::warn!(
                            session_id = %session_id_send,
                            "Failed to write to WebSocket"
                        );
                        break;
                    }
                }
                Outbound::Close(code) => {
                    let frame = CloseFrame {
                        code: code.as_u16(),
                        reason: code.description().into(),
                    };
                    let _ = ws_sink.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }

        let _ = ws_sink.close().await;
    });

    // Tear down sessions that neither heartbeat nor otherwise stay live
    let connection_live = connection.clone();
    let heartbeat_interval = state.config().presence.heartbeat_interval_ms;
    let heartbeat_timeout = Duration::from_millis(state.config().presence.heartbeat_timeout_ms);
    let mut liveness_task = tokio::spawn(async move {
        let mut check = interval(Duration::from_millis((heartbeat_interval / 2).max(100)));
        loop {
            check.tick().await;

            let idle = connection_live.idle_for().await;
            if idle > heartbeat_timeout {
                tracing::warn!(
                    session_id = %connection_live.session_id(),
                    idle_ms = idle.as_millis(),
                    "Connection timed out"
                );
                let _ = connection_live.close(CloseCode::SessionTimeout).await;
                break;
            }
        }
    });

    // Whichever task finishes first ends the session. If the writer is
    // still up, it must drain the queue before the socket drops so a
    // pending close frame reaches the client.
    let writer_alive = tokio::select! {
        _ = &mut recv_task => {
            liveness_task.abort();
            true
        }
        _ = &mut liveness_task => {
            recv_task.abort();
            true
        }
        _ = &mut send_task => {
            recv_task.abort();
            liveness_task.abort();
            false
        }
    };

    cleanup_connection(&state, &connection).await;

    // Dropping the last sender ends the writer once the queue is empty
    drop(connection);
    if writer_alive {
        let _ = tokio::time::timeout(Duration::from_secs(5), send_task).await;
    }
}

/// Remove the session and fan out the fallout: typing indicators the user
/// held are cleared, and if this was their last session an offline
/// presence update goes to everyone sharing a channel.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    let session_id = connection.session_id().to_string();
    tracing::info!(session_id = %session_id, "Cleaning up connection");

    connection.set_state(ConnectionState::Closed).await;

    let user_id = connection.user_id().await;
    state.registry().remove(&session_id).await;

    let Some(user_id) = user_id else {
        return;
    };

    let outcome = classline_service::PresenceService::new(state.context())
        .session_disconnected(user_id, &session_id);

    for channel_id in outcome.stopped_typing_in {
        if let Err(e) = broadcast_stopped(state, channel_id, user_id).await {
            tracing::warn!(error = %e, "Failed to clear typing on disconnect");
        }
    }

    if outcome.went_offline {
        if let Err(e) = broadcast_presence(state, user_id, PresenceStatus::Offline).await {
            tracing::warn!(error = %e, "Failed to broadcast offline presence");
        }
    }
}
