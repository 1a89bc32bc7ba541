//! Typing indicators with bounded lifetimes
//!
//! Every `typing_started` refreshes the deadline; an explicit stop or the
//! sweeper's expiry clears it. A client that disconnects mid-keystroke is
//! cleared by the sweep at the latest.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use classline_core::Snowflake;

/// Live typing state keyed by (channel, user)
#[derive(Default)]
pub struct TypingTracker {
    deadlines: DashMap<(Snowflake, Snowflake), Instant>,
}

impl TypingTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a user as typing. Returns true if they were not already
    /// typing in this channel (i.e. observers should be told).
    pub fn start(&self, channel_id: Snowflake, user_id: Snowflake, ttl: Duration) -> bool {
        self.deadlines
            .insert((channel_id, user_id), Instant::now() + ttl)
            .is_none()
    }

    /// Clear a user's typing state. Returns true if they were typing.
    pub fn stop(&self, channel_id: Snowflake, user_id: Snowflake) -> bool {
        self.deadlines.remove(&(channel_id, user_id)).is_some()
    }

    /// Clear every typing entry for a user, returning the channels that
    /// were affected. Used when a user's last session drops.
    pub fn stop_all(&self, user_id: Snowflake) -> Vec<Snowflake> {
        let channels: Vec<Snowflake> = self
            .deadlines
            .iter()
            .filter(|entry| entry.key().1 == user_id)
            .map(|entry| entry.key().0)
            .collect();
        for channel_id in &channels {
            self.deadlines.remove(&(*channel_id, user_id));
        }
        channels
    }

    /// Remove entries whose deadline has passed, returning them
    pub fn sweep(&self) -> Vec<(Snowflake, Snowflake)> {
        let now = Instant::now();
        let candidates: Vec<(Snowflake, Snowflake)> = self
            .deadlines
            .iter()
            .filter(|entry| *entry.value() <= now)
            .map(|entry| *entry.key())
            .collect();
        let mut expired = Vec::with_capacity(candidates.len());
        for key in candidates {
            // Re-check under the entry lock; a refresh that raced the scan
            // keeps the indicator live and out of the report.
            if self
                .deadlines
                .remove_if(&key, |_, deadline| *deadline <= now)
                .is_some()
            {
                expired.push(key);
            }
        }
        expired
    }

    #[must_use]
    pub fn is_typing(&self, channel_id: Snowflake, user_id: Snowflake) -> bool {
        self.deadlines.contains_key(&(channel_id, user_id))
    }

    /// Users currently typing in a channel, unexpired entries only
    #[must_use]
    pub fn typing_users(&self, channel_id: Snowflake) -> Vec<Snowflake> {
        let now = Instant::now();
        self.deadlines
            .iter()
            .filter(|entry| entry.key().0 == channel_id && *entry.value() > now)
            .map(|entry| entry.key().1)
            .collect()
    }
}
