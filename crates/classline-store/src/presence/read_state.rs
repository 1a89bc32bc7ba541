//! Per-user read cursors
//!
//! The cursor is the highest seq a user has seen in a channel. Unread
//! counts are always derived from the cursor against the log; nothing
//! stores a counter that could drift.

use dashmap::DashMap;

use classline_core::Snowflake;

/// Read cursors keyed by (user, channel)
#[derive(Default)]
pub struct ReadStateStore {
    cursors: DashMap<(Snowflake, Snowflake), u64>,
}

impl ReadStateStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the cursor. Moves only forward; a stale mark never
    /// resurrects unread messages.
    pub fn mark_read(&self, user_id: Snowflake, channel_id: Snowflake, seq: u64) {
        self.cursors
            .entry((user_id, channel_id))
            .and_modify(|cursor| *cursor = (*cursor).max(seq))
            .or_insert(seq);
    }

    /// Highest seq the user has seen, 0 if they never read the channel
    #[must_use]
    pub fn last_read(&self, user_id: Snowflake, channel_id: Snowflake) -> u64 {
        self.cursors
            .get(&(user_id, channel_id))
            .map_or(0, |cursor| *cursor)
    }
}
