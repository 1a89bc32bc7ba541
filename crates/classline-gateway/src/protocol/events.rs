//! Envelope definitions for both directions
//!
//! Inbound and outbound frames are adjacently tagged: the `type` field
//! names the event, `payload` carries its data and is omitted for
//! payload-less events.

use chrono::{DateTime, Utc};
use classline_core::entities::{Channel, ChannelKind, Message, User, UserRole};
use classline_core::Snowflake;
use serde::{Deserialize, Serialize};

/// Events the client may send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Authenticate the connection with an access token. Accepted only
    /// while the connection is still in `Connecting`.
    Authenticate { token: String },

    /// Liveness signal; answered with `heartbeat_ack`
    Heartbeat,

    /// Append a message to a channel the sender belongs to
    SendMessage {
        channel_id: Snowflake,
        content: String,
    },

    /// Start (or refresh) a typing indicator
    TypingStarted { channel_id: Snowflake },

    /// Explicitly clear a typing indicator
    TypingStopped { channel_id: Snowflake },

    /// Declare which channel this session is viewing; marks it read
    SelectChannel { channel_id: Snowflake },

    /// Open (or reuse) the direct channel with another user
    CreateDirectChannel { target_user_id: Snowflake },

    /// Create a named group channel (educators only)
    CreateGroupChannel {
        name: String,
        #[serde(default)]
        description: Option<String>,
        #[serde(default)]
        member_ids: Vec<Snowflake>,
    },

    /// Add a user to a group channel (channel creator only)
    AddChannelMember {
        channel_id: Snowflake,
        user_id: Snowflake,
    },

    /// Remove a user from a group channel (channel creator only)
    RemoveChannelMember {
        channel_id: Snowflake,
        user_id: Snowflake,
    },

    /// Declare an away/online status; offline is set by disconnecting
    StatusUpdate { status: PresenceStatus },

    /// Catch-up read of messages after a known seq cursor
    FetchHistory {
        channel_id: Snowflake,
        #[serde(default)]
        after_seq: u64,
        #[serde(default)]
        limit: Option<usize>,
    },

    /// Contact roster for starting direct channels
    ListContacts,
}

/// Events the server may send
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// First frame on every socket; advertises the heartbeat interval
    Hello { heartbeat_interval_ms: u64 },

    /// Answer to a client heartbeat
    HeartbeatAck,

    /// Post-authentication snapshot
    Ready {
        user: UserSummary,
        session_id: String,
        channels: Vec<ChannelSnapshot>,
    },

    /// A message was appended to one of the recipient's channels
    NewMessage {
        channel_id: Snowflake,
        message: MessagePayload,
    },

    /// Another member started typing
    UserTyping {
        channel_id: Snowflake,
        user_id: Snowflake,
        display_name: String,
    },

    /// A typing indicator was cleared, explicitly or by expiry
    UserStoppedTyping {
        channel_id: Snowflake,
        user_id: Snowflake,
    },

    /// A user sharing a channel with the recipient changed status
    PresenceUpdate {
        user_id: Snowflake,
        status: PresenceStatus,
    },

    /// A channel the recipient belongs to was created (or, for direct
    /// channels, reused; `created` is false on reuse)
    ChannelCreated {
        channel: ChannelSnapshot,
        created: bool,
    },

    /// A user joined a group channel the recipient belongs to
    MemberAdded {
        channel_id: Snowflake,
        user: UserSummary,
    },

    /// A user was removed from a group channel
    MemberRemoved {
        channel_id: Snowflake,
        user_id: Snowflake,
    },

    /// Catch-up slice answering `fetch_history`
    History {
        channel_id: Snowflake,
        messages: Vec<MessagePayload>,
    },

    /// Contact roster answering `list_contacts`
    Contacts { users: Vec<UserSummary> },

    /// Request failed; sent only to the originating connection
    Error { code: String, message: String },
}

impl ServerEvent {
    #[must_use]
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Error {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Online status carried by `presence_update`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PresenceStatus {
    Online,
    Away,
    Offline,
}

/// User data included in events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Snowflake,
    pub email: String,
    pub display_name: String,
    pub avatar_url: String,
    pub role: UserRole,
    pub online: bool,
}

impl UserSummary {
    #[must_use]
    pub fn from_user(user: &User, online: bool) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            display_name: user.display_name.clone(),
            avatar_url: user.avatar_url(),
            role: user.role,
            online,
        }
    }
}

/// Channel data included in `ready` and `channel_created`, computed for
/// a specific recipient (unread count is per-user)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSnapshot {
    pub id: Snowflake,
    pub kind: ChannelKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub members: Vec<UserSummary>,
    pub created_by: Snowflake,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub unread_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<MessagePayload>,
}

impl ChannelSnapshot {
    #[must_use]
    pub fn new(
        channel: &Channel,
        members: Vec<UserSummary>,
        unread_count: u64,
        last_message: Option<MessagePayload>,
    ) -> Self {
        Self {
            id: channel.id,
            kind: channel.kind,
            name: channel.name.clone(),
            description: channel.description.clone(),
            members,
            created_by: channel.created_by,
            created_at: channel.created_at,
            last_activity_at: channel.last_activity_at,
            unread_count,
            last_message,
        }
    }
}

/// Message data on the wire, with the sender denormalized so clients
/// can render without a user lookup
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: Snowflake,
    pub channel_id: Snowflake,
    pub sender_id: Snowflake,
    pub sender_name: String,
    pub sender_avatar: String,
    pub seq: u64,
    pub content: String,
    pub sent_at: DateTime<Utc>,
}

impl MessagePayload {
    #[must_use]
    pub fn new(message: &Message, sender: &User) -> Self {
        Self {
            id: message.id,
            channel_id: message.channel_id,
            sender_id: message.sender_id,
            sender_name: sender.display_name.clone(),
            sender_avatar: sender.avatar_url(),
            seq: message.seq,
            content: message.content.clone(),
            sent_at: message.sent_at,
        }
    }
}
