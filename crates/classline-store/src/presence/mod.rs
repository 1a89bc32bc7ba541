//! Runtime presence state
//!
//! None of this is durable; it reflects live connections and is rebuilt
//! from nothing on restart.

mod online;
mod read_state;
mod typing;

pub use online::PresenceStore;
pub use read_state::ReadStateStore;
pub use typing::TypingTracker;
