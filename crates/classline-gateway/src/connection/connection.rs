//! A single WebSocket connection
//!
//! Holds per-session state: who the session belongs to, which channel it
//! is viewing, and its liveness bookkeeping. Outbound frames go through a
//! bounded queue so a slow reader never blocks a writer.

use crate::protocol::{CloseCode, ServerEvent};
use classline_core::Snowflake;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{mpsc, RwLock};

/// Connection lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Socket accepted, waiting for `authenticate`
    Connecting,
    /// Token validated, `ready` snapshot being assembled
    Authenticated,
    /// `ready` queued; channel-scoped events accepted
    Active,
    /// Being torn down
    Closed,
}

/// A frame queued for the socket writer
#[derive(Debug, Clone)]
pub enum Outbound {
    Event(ServerEvent),
    Close(CloseCode),
}

/// A single WebSocket connection
pub struct Connection {
    session_id: String,
    user_id: RwLock<Option<Snowflake>>,
    state: RwLock<ConnectionState>,
    /// Channel this session has declared it is viewing
    viewing: RwLock<Option<Snowflake>>,
    sender: mpsc::Sender<Outbound>,
    last_seen: RwLock<Instant>,
    created_at: Instant,
}

impl Connection {
    pub fn new(session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        Arc::new(Self {
            session_id,
            user_id: RwLock::new(None),
            state: RwLock::new(ConnectionState::Connecting),
            viewing: RwLock::new(None),
            sender,
            last_seen: RwLock::new(Instant::now()),
            created_at: Instant::now(),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub async fn user_id(&self) -> Option<Snowflake> {
        *self.user_id.read().await
    }

    /// Attach a user after token validation
    pub async fn bind_user(&self, user_id: Snowflake) {
        *self.user_id.write().await = Some(user_id);
        *self.state.write().await = ConnectionState::Authenticated;
    }

    /// Enter `Active`; channel-scoped events are accepted from here on
    pub async fn activate(&self) {
        *self.state.write().await = ConnectionState::Active;
    }

    pub async fn state(&self) -> ConnectionState {
        *self.state.read().await
    }

    pub async fn set_state(&self, state: ConnectionState) {
        *self.state.write().await = state;
    }

    pub async fn is_active(&self) -> bool {
        *self.state.read().await == ConnectionState::Active
    }

    pub async fn viewing(&self) -> Option<Snowflake> {
        *self.viewing.read().await
    }

    pub async fn set_viewing(&self, channel_id: Option<Snowflake>) {
        *self.viewing.write().await = channel_id;
    }

    /// Record inbound traffic for liveness supervision
    pub async fn record_activity(&self) {
        *self.last_seen.write().await = Instant::now();
    }

    pub async fn idle_for(&self) -> std::time::Duration {
        self.last_seen.read().await.elapsed()
    }

    /// Queue an event for the socket writer
    pub async fn send(&self, event: ServerEvent) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Event(event)).await
    }

    /// Queue a close frame; the writer sends it and shuts the socket
    pub async fn close(&self, code: CloseCode) -> Result<(), mpsc::error::SendError<Outbound>> {
        self.sender.send(Outbound::Close(code)).await
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("session_id", &self.session_id)
            .field("age", &self.created_at.elapsed())
            .finish()
    }
}
