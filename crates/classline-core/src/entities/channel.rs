//! Channel entity - a direct conversation or a named group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::Snowflake;

/// Channel kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// One-to-one conversation; at most one exists per user pair
    #[default]
    Direct,
    /// Named multi-member channel, created by an educator
    Group,
}

/// Channel entity
///
/// Membership is part of the entity: fanout audiences, permission checks,
/// and the direct-channel pair key all derive from `members`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: Snowflake,
    pub kind: ChannelKind,
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Vec<Snowflake>,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    /// Timestamp of the most recent message, used for channel ordering
    pub last_activity_at: DateTime<Utc>,
}

impl Channel {
    /// Create a direct channel between two users
    #[must_use]
    pub fn new_direct(id: Snowflake, a: Snowflake, b: Snowflake) -> Self {
        let now = Utc::now();
        Self {
            id,
            kind: ChannelKind::Direct,
            name: None,
            description: None,
            members: vec![a, b],
            created_by: a,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Create a named group channel
    ///
    /// The creator is always a member; duplicates in `members` are dropped
    /// while preserving first-seen order.
    #[must_use]
    pub fn new_group(
        id: Snowflake,
        name: String,
        description: Option<String>,
        created_by: Snowflake,
        members: Vec<Snowflake>,
    ) -> Self {
        let mut deduped = Vec::with_capacity(members.len() + 1);
        deduped.push(created_by);
        for member in members {
            if !deduped.contains(&member) {
                deduped.push(member);
            }
        }

        let now = Utc::now();
        Self {
            id,
            kind: ChannelKind::Group,
            name: Some(name),
            description,
            members: deduped,
            created_by,
            created_at: now,
            last_activity_at: now,
        }
    }

    #[inline]
    #[must_use]
    pub fn is_direct(&self) -> bool {
        matches!(self.kind, ChannelKind::Direct)
    }

    #[inline]
    #[must_use]
    pub fn is_member(&self, user_id: Snowflake) -> bool {
        self.members.contains(&user_id)
    }

    /// The other participant of a direct channel
    #[must_use]
    pub fn peer_of(&self, user_id: Snowflake) -> Option<Snowflake> {
        if !self.is_direct() {
            return None;
        }
        self.members.iter().copied().find(|&m| m != user_id)
    }

    /// Display name: the group name, or empty for directs (the client
    /// renders the peer's name there)
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn touch(&mut self, at: DateTime<Utc>) {
        self.last_activity_at = at;
    }
}
