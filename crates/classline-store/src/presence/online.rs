//! Online presence derived from live sessions
//!
//! A user is online while at least one of their sessions is connected.
//! Transitions fire only on the first connect and the last disconnect,
//! so a second tab never re-announces presence.

use std::collections::HashSet;

use dashmap::{DashMap, DashSet};

use classline_core::Snowflake;

/// Session-counted online state with a user-declared away flag
#[derive(Default)]
pub struct PresenceStore {
    sessions: DashMap<Snowflake, HashSet<String>>,
    away: DashSet<Snowflake>,
}

impl PresenceStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a connected session. Returns true if the user just came
    /// online (this was their first session).
    pub fn session_connected(&self, user_id: Snowflake, session_id: &str) -> bool {
        let mut entry = self.sessions.entry(user_id).or_default();
        let was_offline = entry.is_empty();
        entry.insert(session_id.to_string());
        if was_offline {
            // A fresh first session starts online, not in a stale away state
            self.away.remove(&user_id);
        }
        was_offline
    }

    /// Record a disconnected session. Returns true if the user just went
    /// offline (this was their last session).
    pub fn session_disconnected(&self, user_id: Snowflake, session_id: &str) -> bool {
        let Some(mut entry) = self.sessions.get_mut(&user_id) else {
            return false;
        };
        entry.remove(session_id);
        if entry.is_empty() {
            drop(entry);
            self.sessions.remove_if(&user_id, |_, set| set.is_empty());
            self.away.remove(&user_id);
            true
        } else {
            false
        }
    }

    /// Flip the user's away flag. Returns true if the flag changed.
    pub fn set_away(&self, user_id: Snowflake, away: bool) -> bool {
        if away {
            self.away.insert(user_id)
        } else {
            self.away.remove(&user_id).is_some()
        }
    }

    #[must_use]
    pub fn is_away(&self, user_id: Snowflake) -> bool {
        self.away.contains(&user_id)
    }

    #[must_use]
    pub fn is_online(&self, user_id: Snowflake) -> bool {
        self.sessions
            .get(&user_id)
            .is_some_and(|set| !set.is_empty())
    }

    #[must_use]
    pub fn session_count(&self, user_id: Snowflake) -> usize {
        self.sessions.get(&user_id).map_or(0, |set| set.len())
    }
}
