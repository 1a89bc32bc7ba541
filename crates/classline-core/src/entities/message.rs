//! Message entity - one entry in a channel's append-only log

use chrono::{DateTime, Utc};

use crate::value_objects::Snowflake;

/// Maximum message content length in characters
pub const MAX_CONTENT_LEN: usize = 4000;

/// Message entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub sender_id: Snowflake,
    /// Position in the channel log, dense and starting at 1.
    /// Zero until the log assigns it on append.
    pub seq: u64,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl Message {
    #[must_use]
    pub fn new(id: Snowflake, channel_id: Snowflake, sender_id: Snowflake, content: String) -> Self {
        Self {
            id,
            channel_id,
            sender_id,
            seq: 0,
            content,
            sent_at: Utc::now(),
        }
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

}
