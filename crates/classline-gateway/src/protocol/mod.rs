//! Gateway wire protocol
//!
//! Every frame is a JSON envelope `{ "type": ..., "payload": ... }`.

mod close_codes;
mod events;

pub use close_codes::CloseCode;
pub use events::{
    ChannelSnapshot, ClientEvent, MessagePayload, PresenceStatus, ServerEvent, UserSummary,
};
