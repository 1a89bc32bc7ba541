//! Session registry
//!
//! Tracks every live connection and the sessions belonging to each user,
//! and fans events out to them. A user may hold several sessions at once.

use super::connection::{Connection, Outbound};
use crate::protocol::ServerEvent;
use classline_core::Snowflake;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Registry of live connections
pub struct SessionRegistry {
    /// Connections by session id
    connections: DashMap<String, Arc<Connection>>,

    /// User id to session ids
    user_sessions: DashMap<Snowflake, HashSet<String>>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_sessions: DashMap::new(),
        }
    }

    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a freshly accepted socket
    pub fn register(&self, session_id: String, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let connection = Connection::new(session_id.clone(), sender);
        self.connections.insert(session_id.clone(), connection.clone());

        tracing::debug!(session_id = %session_id, "Connection registered");

        connection
    }

    /// Remove a connection and its user index entry
    pub async fn remove(&self, session_id: &str) {
        if let Some((_, connection)) = self.connections.remove(session_id) {
            if let Some(user_id) = connection.user_id().await {
                self.user_sessions.alter(&user_id, |_, mut sessions| {
                    sessions.remove(session_id);
                    sessions
                });
                self.user_sessions.retain(|_, sessions| !sessions.is_empty());
            }

            tracing::debug!(session_id = %session_id, "Connection removed");
        }
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(session_id).map(|r| r.clone())
    }

    /// Link a connection to its authenticated user
    pub async fn bind_user(&self, session_id: &str, user_id: Snowflake) -> bool {
        if let Some(connection) = self.connections.get(session_id) {
            connection.bind_user(user_id).await;

            self.user_sessions
                .entry(user_id)
                .or_default()
                .insert(session_id.to_string());

            tracing::debug!(session_id = %session_id, user_id = %user_id, "Session bound to user");

            true
        } else {
            false
        }
    }

    /// All live connections for a user
    pub fn user_connections(&self, user_id: Snowflake) -> Vec<Arc<Connection>> {
        self.user_sessions
            .get(&user_id)
            .map(|sessions| {
                sessions
                    .iter()
                    .filter_map(|sid| self.connections.get(sid).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Queue an event on every session of a user. Returns how many
    /// sessions accepted it.
    pub async fn send_to_user(&self, user_id: Snowflake, event: &ServerEvent) -> usize {
        let mut sent = 0;
        for conn in self.user_connections(user_id) {
            if conn.send(event.clone()).await.is_ok() {
                sent += 1;
            }
        }
        sent
    }

    /// Fan an event out to a set of users, optionally skipping one
    pub async fn send_to_users(
        &self,
        user_ids: &[Snowflake],
        event: &ServerEvent,
        exclude: Option<Snowflake>,
    ) -> usize {
        let mut sent = 0;
        for &user_id in user_ids {
            if Some(user_id) == exclude {
                continue;
            }
            sent += self.send_to_user(user_id, event).await;
        }
        sent
    }

    /// Whether any of the user's sessions has the channel selected
    pub async fn is_viewing(&self, user_id: Snowflake, channel_id: Snowflake) -> bool {
        for conn in self.user_connections(user_id) {
            if conn.viewing().await == Some(channel_id) {
                return true;
            }
        }
        false
    }

    pub fn session_count(&self) -> usize {
        self.connections.len()
    }

    pub fn user_count(&self) -> usize {
        self.user_sessions.len()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.connections.len())
            .field("users", &self.user_sessions.len())
            .finish()
    }
}
